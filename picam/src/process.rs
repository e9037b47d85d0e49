use std::process::Stdio;

use tokio::process::{Child, ChildStdout, Command};

use crate::{config::CameraConfig, error::CaptureError};

/// A running capture process.
///
/// The child is spawned with `kill_on_drop`, so it is killed on every path
/// that drops this value, including unwinding.
pub(crate) struct CaptureProcess {
    child: Child,
    pid: Option<u32>,
}

impl CaptureProcess {
    /// Spawns `config.program` and takes its stdout.
    pub fn spawn(config: &CameraConfig) -> Result<(Self, ChildStdout), CaptureError> {
        let args = config.args();
        log::debug!("spawning {} {}", config.program, args.join(" "));

        let start_err = |source| CaptureError::Start {
            program: config.program.clone(),
            source,
        };

        let mut child = Command::new(&config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(start_err)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| start_err(std::io::Error::other("stdout not captured")))?;

        let pid = child.id();
        log::info!("{} started, pid: {:?}", config.program, pid);
        Ok((Self { child, pid }, stdout))
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Kills the process and waits for it to exit. Failures are logged only.
    pub async fn terminate(mut self) {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                log::debug!("capture process {:?} already exited: {}", self.pid, status);
                return;
            }
            Ok(None) => {}
            Err(e) => log::warn!("capture process {:?} status: {}", self.pid, e),
        }

        match self.child.kill().await {
            Ok(()) => log::debug!("capture process {:?} killed", self.pid),
            Err(e) => log::warn!("failed to kill capture process {:?}: {}", self.pid, e),
        }
    }
}
