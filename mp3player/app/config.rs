use super::error::App;
use log::{info, warn};
use mp3player::{PinConfig, PlayerConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    /// Rotating log files go here; stderr when unset.
    pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct SimulatorConfig {
    pub bitrate_kbps: u32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self { bitrate_kbps: 128 }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub music_dir: PathBuf,
    pub pins: PinConfig,
    pub player: PlayerConfig,
    pub log: LogConfig,
    pub simulator: SimulatorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            music_dir: PathBuf::from("."),
            pins: PinConfig::default(),
            player: PlayerConfig::default(),
            log: LogConfig::default(),
            simulator: SimulatorConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml(content: &str) -> Result<Self, App> {
        Ok(toml::from_str(content)?)
    }

    pub async fn load(file_path: &Path) -> Result<Self, App> {
        if !file_path.exists() {
            warn!(
                "Config file {} not found, using defaults",
                file_path.display()
            );
            return Ok(Self::default());
        }

        info!("Loading config from {}", file_path.display());
        let content = tokio::fs::read_to_string(file_path).await?;
        Self::from_toml(&content)
    }
}
