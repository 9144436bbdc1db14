use flexi_logger::FlexiLoggerError;
use mp3player::PlayerError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum App {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Message parsing error: {0}")]
    Message(#[from] serde_json::Error),

    #[error("Logger initialization error: {0}")]
    Logger(#[from] FlexiLoggerError),

    #[error("Player error: {0}")]
    Player(#[from] PlayerError),
}
