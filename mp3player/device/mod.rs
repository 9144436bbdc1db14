pub mod sim;
pub mod vs1053;

pub use sim::{SimulatedDecoder, SimulatedLink};
pub use vs1053::{Vs1053, Vs1053Bus, Vs1053Link};

use crate::config::PinConfig;
use crate::error::DeviceError;
use async_trait::async_trait;
use std::time::Duration;

pub const MIN_VOLUME: u8 = 0;
pub const MAX_VOLUME: u8 = 21;
pub const DEFAULT_VOLUME: u8 = 12;

/// A hardware decoder the player task drives. Only the task ever holds it.
#[async_trait]
pub trait DecoderDevice: Send + 'static {
    /// Prepares the decoder for the first bytes of a new stream.
    async fn start_playing(&mut self) -> Result<(), DeviceError>;

    /// Flushes and cancels the current stream.
    async fn stop(&mut self) -> Result<(), DeviceError>;

    /// Raises the volume one step and returns the new level.
    async fn volume_up(&mut self) -> Result<u8, DeviceError>;

    /// Lowers the volume one step and returns the new level.
    async fn volume_down(&mut self) -> Result<u8, DeviceError>;

    fn volume(&self) -> u8;

    /// Level of the data request line.
    fn is_ready_for_data(&mut self) -> bool;

    async fn wait_for_data_request(&mut self, poll_interval: Duration) {
        while !self.is_ready_for_data() {
            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn feed(&mut self, data: &[u8]) -> Result<(), DeviceError>;
}

/// The bus connection a decoder is reached through. Attaching performs the
/// first hardware I/O of a player.
#[async_trait]
pub trait DecoderLink: Send + 'static {
    type Device: DecoderDevice;

    async fn attach(self, pins: PinConfig) -> Result<Self::Device, DeviceError>;
}

pub(crate) fn step_up(level: u8) -> u8 {
    level.saturating_add(1).min(MAX_VOLUME)
}

pub(crate) fn step_down(level: u8) -> u8 {
    level.saturating_sub(1).max(MIN_VOLUME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_steps_clamp() {
        assert_eq!(step_up(MAX_VOLUME), MAX_VOLUME);
        assert_eq!(step_up(MAX_VOLUME - 1), MAX_VOLUME);
        assert_eq!(step_down(MIN_VOLUME), MIN_VOLUME);
        assert_eq!(step_down(1), 0);
        assert_eq!(step_up(u8::MAX), MAX_VOLUME);
    }
}
