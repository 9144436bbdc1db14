use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlayerState {
    Idle,
    Playing,
    Stopping,
}

/// Snapshot published by the player task after every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackStatus {
    pub state: PlayerState,
    pub file: Option<String>,
    pub volume: u8,
}

impl PlaybackStatus {
    pub(crate) fn idle(volume: u8) -> Self {
        Self {
            state: PlayerState::Idle,
            file: None,
            volume,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    Command,
    EndOfStream,
    Replaced,
    DeviceError,
    ReadError,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PlayerEvent {
    Started { path: String },
    Stopped { path: String, reason: StopReason },
    FileNotFound { path: String },
    FileOpenFailed { path: String, reason: String },
    FileReadFailed { path: String, reason: String },
    DeviceFault { reason: String },
    VolumeChanged { volume: u8 },
    CommandIgnored { command: u8 },
}
