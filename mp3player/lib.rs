//! Background playback task for SPI-attached MP3 decoder chips.
//!
//! A [`Player`] owns one decoder. Producers anywhere in the program send
//! [`ControlMessage`]s through the bounded [`CommandQueue`]; the player task
//! consumes them in order and keeps the decoder fed while a file plays.

pub mod config;
pub mod device;
pub mod error;
pub mod message;
pub mod player;
pub mod queue;
pub mod store;

pub use config::{PinConfig, PlayerConfig};
pub use device::{DecoderDevice, DecoderLink, SimulatedLink, Vs1053Link};
pub use error::{DeviceError, PlayerError, StoreError};
pub use message::{ControlMessage, PlayerCommand};
pub use player::{PlaybackStatus, Player, PlayerEvent, PlayerState, StopReason};
pub use queue::{CommandQueue, Inbox, QueueHandle, WeakQueueHandle};
pub use store::{AudioStream, DirStore, FileStore, MemoryStore};
