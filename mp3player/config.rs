use crate::queue::DEFAULT_QUEUE_CAPACITY;
use serde::Deserialize;
use std::time::Duration;

/// Pin assignment of the decoder chip. Captured at construction, never changed.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinConfig {
    pub cs: u8,  // XCS
    pub dcs: u8, // XDCS
    pub dreq: u8,
}

impl PinConfig {
    pub fn new(cs: u8, dcs: u8, dreq: u8) -> Self {
        Self { cs, dcs, dreq }
    }
}

impl Default for PinConfig {
    fn default() -> Self {
        Self::new(5, 16, 4)
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct PlayerConfig {
    pub queue_capacity: usize,
    /// Bytes pushed to the decoder per data request.
    pub chunk_size: usize,
    pub poll_interval_ms: u64,
    /// How long DREQ may stay low before the current file is abandoned.
    pub data_request_timeout_ms: u64,
    pub teardown_timeout_ms: u64,
}

impl PlayerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn data_request_timeout(&self) -> Duration {
        Duration::from_millis(self.data_request_timeout_ms)
    }

    pub fn teardown_timeout(&self) -> Duration {
        Duration::from_millis(self.teardown_timeout_ms)
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            chunk_size: 32,
            poll_interval_ms: 2,
            data_request_timeout_ms: 2000,
            teardown_timeout_ms: 1000,
        }
    }
}
