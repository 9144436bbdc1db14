use serde::{Deserialize, Serialize};
use std::fmt;

/// Commands understood by the player task.
///
/// The discriminants are the wire values. Anything outside `0..=4` decodes to
/// [`PlayerCommand::Unknown`] instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
#[repr(u8)]
pub enum PlayerCommand {
    Unknown = 0,
    PlayFile = 1,
    Stop = 2,
    VolumeUp = 3,
    VolumeDown = 4,
}

impl From<u8> for PlayerCommand {
    fn from(value: u8) -> Self {
        match value {
            1 => PlayerCommand::PlayFile,
            2 => PlayerCommand::Stop,
            3 => PlayerCommand::VolumeUp,
            4 => PlayerCommand::VolumeDown,
            _ => PlayerCommand::Unknown,
        }
    }
}

impl From<PlayerCommand> for u8 {
    fn from(command: PlayerCommand) -> Self {
        command as u8
    }
}

impl fmt::Display for PlayerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerCommand::Unknown => "UNKNOWN",
            PlayerCommand::PlayFile => "PLAY FILE",
            PlayerCommand::Stop => "STOP",
            PlayerCommand::VolumeUp => "VOLUME UP",
            PlayerCommand::VolumeDown => "VOLUME DOWN",
        };
        f.write_str(name)
    }
}

/// A unit of intent sent from a producer to the player task.
///
/// The file path is owned by the message, so moving it through the queue needs
/// no further bookkeeping. It is only read for [`PlayerCommand::PlayFile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    pub command: PlayerCommand,
    #[serde(default)]
    pub file_path: Option<String>,
}

impl ControlMessage {
    pub fn new(command: PlayerCommand) -> Self {
        Self {
            command,
            file_path: None,
        }
    }

    pub fn play_file(path: impl Into<String>) -> Self {
        Self {
            command: PlayerCommand::PlayFile,
            file_path: Some(path.into()),
        }
    }

    pub fn stop() -> Self {
        Self::new(PlayerCommand::Stop)
    }

    pub fn volume_up() -> Self {
        Self::new(PlayerCommand::VolumeUp)
    }

    pub fn volume_down() -> Self {
        Self::new(PlayerCommand::VolumeDown)
    }

    /// The path to play, if this is a `PlayFile` carrying one.
    pub fn path(&self) -> Option<&str> {
        match self.command {
            PlayerCommand::PlayFile => self.file_path.as_deref(),
            _ => None,
        }
    }
}
