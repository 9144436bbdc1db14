mod app;
mod console;

use app::config::{AppConfig, LogConfig};
use app::error::App;
use clap::Parser;
use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};
use log::{info, warn};
use mp3player::{DirStore, Player, PlayerError, SimulatedLink};
use std::path::PathBuf;
use tokio::sync::{broadcast, watch};
use tokio::task;

#[derive(Parser)]
#[command(
    name = "mp3player",
    about = "Play MP3 files through a decoder task.",
    version = "1.0.0"
)]
struct Cli {
    #[arg(short = 'c', long = "config", default_value = "mp3player.toml")]
    config: PathBuf,

    #[arg(short = 'm', long = "music-dir", help = "Directory files are played from")]
    music_dir: Option<PathBuf>,

    #[arg(short = 'l', long = "log-level", help = "Log specification, e.g. debug")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), App> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config).await?;
    if let Some(music_dir) = cli.music_dir {
        config.music_dir = music_dir;
    }
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }

    let _logger = start_logger(&config.log)?;
    info!("Playing from {}", config.music_dir.display());

    let mut player = Player::with_config(config.pins, config.player.clone());
    player
        .begin(
            None,
            SimulatedLink::new(config.simulator.bitrate_kbps),
            DirStore::new(&config.music_dir),
        )
        .await?;
    let queue = player.get_queue().ok_or(PlayerError::NotStarted)?;

    task::spawn(log_events(player.subscribe()));

    let (stop_sender, stop_receiver) = watch::channel(());
    task::spawn(console::run_console(queue, stop_sender));

    tokio::select! {
        () = wait_for_stop_signal(stop_receiver) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    player.shutdown().await?;
    Ok(())
}

fn start_logger(config: &LogConfig) -> Result<LoggerHandle, App> {
    let logger = Logger::try_with_str(&config.level)?;
    let handle = match &config.directory {
        Some(directory) => logger
            .log_to_file(FileSpec::default().directory(directory))
            .rotate(
                Criterion::Size(1_000_000),
                Naming::Timestamps,
                Cleanup::KeepLogFiles(3),
            )
            .duplicate_to_stderr(Duplicate::Warn)
            .start()?,
        None => logger.log_to_stderr().start()?,
    };
    Ok(handle)
}

async fn wait_for_stop_signal(mut stop_receiver: watch::Receiver<()>) {
    // A dropped sender means the console is gone, which is a stop as well.
    let _ = stop_receiver.changed().await;
}

async fn log_events(mut events: broadcast::Receiver<mp3player::PlayerEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => info!("Player event: {:?}", event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Missed {} player events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
