use super::{step_down, step_up, DecoderDevice, DecoderLink, DEFAULT_VOLUME, MAX_VOLUME};
use crate::config::PinConfig;
use crate::error::DeviceError;
use async_trait::async_trait;
use log::{debug, info};
use std::time::Duration;
use tokio::time::Instant;

const FIFO_SIZE: usize = 2048;
const DREQ_THRESHOLD: usize = 32;
const FEED_POLL: Duration = Duration::from_millis(1);
const FEED_ATTEMPTS: u32 = 1000;

/// Stands in for a decoder chip on a host: bytes are consumed from a 2 KiB
/// FIFO at the stream bitrate, and DREQ is high while 32 bytes fit.
#[derive(Debug)]
pub struct SimulatedDecoder {
    bytes_per_sec: u64,
    fifo: usize,
    drained_at: Instant,
    volume: u8,
    playing: bool,
    total_fed: u64,
}

impl SimulatedDecoder {
    pub fn new(bitrate_kbps: u32, volume: u8) -> Self {
        Self {
            bytes_per_sec: u64::from(bitrate_kbps.max(1)) * 1000 / 8,
            fifo: 0,
            drained_at: Instant::now(),
            volume: volume.min(MAX_VOLUME),
            playing: false,
            total_fed: 0,
        }
    }

    /// Bytes accepted since the last `start_playing`.
    pub fn total_fed(&self) -> u64 {
        self.total_fed
    }

    fn drain(&mut self) {
        let now = Instant::now();
        if self.fifo == 0 {
            self.drained_at = now;
            return;
        }
        let elapsed_us = u64::try_from(now.duration_since(self.drained_at).as_micros())
            .unwrap_or(u64::MAX);
        let consumed = elapsed_us.saturating_mul(self.bytes_per_sec) / 1_000_000;
        let consumed = usize::try_from(consumed).unwrap_or(usize::MAX);
        if consumed == 0 {
            return;
        }
        if consumed >= self.fifo {
            self.fifo = 0;
            self.drained_at = now;
        } else {
            self.fifo -= consumed;
            // Keep the sub-byte remainder for the next call.
            let spent_us = consumed as u64 * 1_000_000 / self.bytes_per_sec;
            self.drained_at += Duration::from_micros(spent_us);
        }
    }

    fn free(&self) -> usize {
        FIFO_SIZE - self.fifo
    }

    /// Waits until `len` bytes fit, like a chip holding DREQ low.
    async fn wait_for_room(&mut self, len: usize) -> Result<(), DeviceError> {
        for _ in 0..FEED_ATTEMPTS {
            self.drain();
            if self.free() >= len {
                return Ok(());
            }
            tokio::time::sleep(FEED_POLL).await;
        }
        Err(DeviceError::NotReady)
    }
}

#[async_trait]
impl DecoderDevice for SimulatedDecoder {
    async fn start_playing(&mut self) -> Result<(), DeviceError> {
        self.fifo = 0;
        self.total_fed = 0;
        self.drained_at = Instant::now();
        self.playing = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), DeviceError> {
        if self.playing {
            debug!("Simulated decoder stopped after {} bytes", self.total_fed);
        }
        self.fifo = 0;
        self.playing = false;
        Ok(())
    }

    async fn volume_up(&mut self) -> Result<u8, DeviceError> {
        self.volume = step_up(self.volume);
        Ok(self.volume)
    }

    async fn volume_down(&mut self) -> Result<u8, DeviceError> {
        self.volume = step_down(self.volume);
        Ok(self.volume)
    }

    fn volume(&self) -> u8 {
        self.volume
    }

    fn is_ready_for_data(&mut self) -> bool {
        self.drain();
        self.free() >= DREQ_THRESHOLD
    }

    async fn feed(&mut self, data: &[u8]) -> Result<(), DeviceError> {
        for piece in data.chunks(DREQ_THRESHOLD) {
            self.wait_for_room(piece.len()).await?;
            self.fifo += piece.len();
            self.total_fed += piece.len() as u64;
        }
        Ok(())
    }
}

pub struct SimulatedLink {
    bitrate_kbps: u32,
    volume: u8,
}

impl SimulatedLink {
    pub fn new(bitrate_kbps: u32) -> Self {
        Self {
            bitrate_kbps,
            volume: DEFAULT_VOLUME,
        }
    }

    #[must_use]
    pub fn with_volume(mut self, volume: u8) -> Self {
        self.volume = volume;
        self
    }
}

#[async_trait]
impl DecoderLink for SimulatedLink {
    type Device = SimulatedDecoder;

    async fn attach(self, pins: PinConfig) -> Result<Self::Device, DeviceError> {
        info!(
            "Simulated decoder at {} kbps (XCS={}, XDCS={}, DREQ={})",
            self.bitrate_kbps, pins.cs, pins.dcs, pins.dreq
        );
        Ok(SimulatedDecoder::new(self.bitrate_kbps, self.volume))
    }
}
