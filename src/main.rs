use clap::Parser;
use tokio_util::sync::CancellationToken;

mod cli;
mod jpeg;

use cli::{Cli, Commands};

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .filter_module("picam", level)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cancel = CancellationToken::new();

    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("ctrl+c received");
            cancel_clone.cancel();
        }
    });

    let config = cli.camera.resolve()?;
    match cli.command {
        Commands::Snap { output, quality } => cli::snap(config, &output, quality, cancel).await,
        Commands::Frames { count } => cli::frames(config, count, cancel).await,
        Commands::Bench { count } => cli::bench(config, count, cancel).await,
        Commands::Info { json } => cli::info(&config, json),
    }
}
