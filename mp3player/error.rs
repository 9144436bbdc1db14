use std::io;
use thiserror::Error;
use tokio::sync::mpsc::error::{SendError, SendTimeoutError, TrySendError};
use tokio::task::JoinError;

/// Errors surfaced to the owner of a [`crate::Player`] and to queue producers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    #[error("Decoder attach failed: {0}")]
    DeviceAttachFailed(String),

    #[error("Player already started")]
    AlreadyStarted,

    #[error("Player not started")]
    NotStarted,

    #[error("Command queue is full")]
    QueueFull,

    #[error("Command queue is closed")]
    QueueClosed,

    #[error("Timed out waiting for a command")]
    Timeout,

    #[error("Player task did not exit within {0} ms")]
    TeardownTimeout(u64),

    #[error("Join task error: {0}")]
    Join(String),
}

impl<T> From<TrySendError<T>> for PlayerError {
    fn from(error: TrySendError<T>) -> Self {
        match error {
            TrySendError::Full(_) => PlayerError::QueueFull,
            TrySendError::Closed(_) => PlayerError::QueueClosed,
        }
    }
}

impl<T> From<SendTimeoutError<T>> for PlayerError {
    fn from(error: SendTimeoutError<T>) -> Self {
        match error {
            SendTimeoutError::Timeout(_) => PlayerError::QueueFull,
            SendTimeoutError::Closed(_) => PlayerError::QueueClosed,
        }
    }
}

impl<T> From<SendError<T>> for PlayerError {
    fn from(_: SendError<T>) -> Self {
        PlayerError::QueueClosed
    }
}

impl From<JoinError> for PlayerError {
    fn from(error: JoinError) -> Self {
        PlayerError::Join(error.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Bus transfer error: {0}")]
    Bus(String),

    #[error("Decoder did not raise its data request line")]
    NotReady,

    #[error("Unsupported decoder chip version {0}")]
    UnsupportedChip(u8),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Failed to open {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("Read error: {0}")]
    Read(String),
}

impl StoreError {
    pub(crate) fn from_io(path: &str, error: &io::Error) -> Self {
        if error.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound(path.to_string())
        } else {
            StoreError::Open {
                path: path.to_string(),
                reason: error.to_string(),
            }
        }
    }
}
