use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use picam::{Camera, CameraConfig, CaptureError, Format};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::jpeg;

#[derive(Parser)]
#[command(name = "picam")]
#[command(about = "Grab frames from the Raspberry Pi camera through raspiyuv")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub camera: CameraArgs,

    /// Debug logging for the capture pipeline
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct CameraArgs {
    /// JSON camera config; flags below override it
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub width: Option<u32>,

    #[arg(long, global = true)]
    pub height: Option<u32>,

    /// yuv, rgb or gray
    #[arg(short, long, global = true)]
    pub format: Option<Format>,

    /// Capture program (default: raspiyuv)
    #[arg(long, global = true)]
    pub program: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Save one frame as JPEG
    Snap {
        #[arg(short, long, default_value = "image.jpg")]
        output: PathBuf,

        #[arg(short, long, default_value_t = 90)]
        quality: u8,
    },

    /// Read frames and print their size
    Frames {
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },

    /// Measure the time between frames
    Bench {
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },

    /// Print raw frame layout for every format
    Info {
        #[arg(long)]
        json: bool,
    },
}

impl CameraArgs {
    pub fn resolve(&self) -> anyhow::Result<CameraConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("read config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parse config {}", path.display()))?
            }
            None => CameraConfig::default(),
        };

        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(program) = &self.program {
            config.program = program.clone();
        }
        Ok(config)
    }
}

/// Runs `fut` unless ctrl+c comes first.
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, CaptureError>>,
) -> anyhow::Result<Option<T>> {
    tokio::select! {
        _ = cancel.cancelled() => Ok(None),
        result = fut => Ok(Some(result?)),
    }
}

fn start(config: CameraConfig) -> anyhow::Result<Camera> {
    let (width, height, format) = (config.width, config.height, config.format);
    Camera::with_config(config)
        .with_context(|| format!("start {format} capture at {width}x{height}"))
}

pub async fn snap(
    config: CameraConfig,
    output: &Path,
    quality: u8,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let cam = start(config)?;
    let image = until_cancelled(&cancel, cam.read_image()).await;
    cam.close().await;

    let Some(image) = image? else {
        return Ok(());
    };
    jpeg::save(&image, output, quality)?;
    println!(
        "saved {} frame {}x{} to {}",
        image.format(),
        image.width(),
        image.height(),
        output.display()
    );
    Ok(())
}

pub async fn frames(
    config: CameraConfig,
    count: usize,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let cam = start(config)?;
    println!("Reading {} frames:", count);

    let result = async {
        for _ in 0..count {
            let Some(image) = until_cancelled(&cancel, cam.read_image()).await? else {
                break;
            };
            println!("got ({},{})", image.width(), image.height());

            let Some(raw) = until_cancelled(&cancel, cam.read_raw()).await? else {
                break;
            };
            println!("read {} bytes", raw.len());
        }
        anyhow::Ok(())
    }
    .await;

    cam.close().await;
    result
}

pub async fn bench(
    config: CameraConfig,
    count: usize,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let format = config.format;
    let cam = start(config)?;

    // first frame includes camera warm-up
    if until_cancelled(&cancel, cam.read_raw()).await?.is_none() {
        cam.close().await;
        return Ok(());
    }

    let mut intervals = Vec::with_capacity(count);
    let mut frames = Box::pin(cam.reader().frames().take(count));
    let mut last = Instant::now();
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => None,
            frame = frames.next() => frame,
        };
        if next.is_none() {
            break;
        }
        let now = Instant::now();
        intervals.push(now - last);
        last = now;
    }

    let stats = cam.stats();
    cam.close().await;

    match average(&intervals) {
        Some(avg) => println!(
            "{}: {} frames, {:.1} ms/frame, {} read, {} dropped",
            format,
            intervals.len(),
            avg.as_secs_f64() * 1000.0,
            stats.frames_read,
            stats.frames_dropped
        ),
        None => println!("{}: no frames", format),
    }
    Ok(())
}

fn average(intervals: &[Duration]) -> Option<Duration> {
    let n = u32::try_from(intervals.len()).ok().filter(|n| *n > 0)?;
    Some(intervals.iter().sum::<Duration>() / n)
}

#[derive(Debug, Serialize)]
struct FormatInfo {
    format: Format,
    flag: Option<&'static str>,
    padded_width: u32,
    padded_height: u32,
    raw_size: usize,
    decoded_size: usize,
}

fn format_info(width: u32, height: u32) -> anyhow::Result<Vec<FormatInfo>> {
    Format::ALL
        .into_iter()
        .map(|format| {
            let sizes = format.padded_size(width, height).zip(
                format
                    .raw_size(width, height)
                    .zip(format.decoded_len(width, height)),
            );
            let Some(((padded_width, padded_height), (raw_size, decoded_size))) = sizes else {
                anyhow::bail!("{format} frame at {width}x{height} is too large");
            };
            Ok(FormatInfo {
                format,
                flag: format.flag(),
                padded_width,
                padded_height,
                raw_size,
                decoded_size,
            })
        })
        .collect()
}

pub fn info(config: &CameraConfig, json: bool) -> anyhow::Result<()> {
    let infos = format_info(config.width, config.height)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    println!("{}x{}", config.width, config.height);
    for info in &infos {
        println!(
            "{:<5} flag: {:<7} padded: {}x{} raw: {} bytes decoded: {} bytes",
            info.format.to_string(),
            info.flag.unwrap_or("-"),
            info.padded_width,
            info.padded_height,
            info.raw_size,
            info.decoded_size
        );
    }
    println!("{} {}", config.program, config.args().join(" "));
    Ok(())
}
