#![allow(dead_code)]

use async_trait::async_trait;
use mp3player::device::MAX_VOLUME;
use mp3player::device::SimulatedDecoder;
use mp3player::{
    DecoderDevice, DecoderLink, DeviceError, FileStore, MemoryStore, PinConfig, PlaybackStatus,
    Player, PlayerConfig, PlayerEvent, PlayerState, QueueHandle, SimulatedLink,
};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

pub const WAIT: Duration = Duration::from_secs(2);

/// Everything the player asked of the decoder, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    StartPlaying,
    Stop,
    VolumeUp(u8),
    VolumeDown(u8),
    Feed(Vec<u8>),
}

/// Shared view into a [`FakeDevice`] that outlives the player task.
#[derive(Clone)]
pub struct Probe {
    calls: Arc<Mutex<Vec<Call>>>,
    ready: Arc<AtomicBool>,
    fail_feed: Arc<AtomicBool>,
    attaches: Arc<AtomicUsize>,
}

impl Probe {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            ready: Arc::new(AtomicBool::new(true)),
            fail_feed: Arc::new(AtomicBool::new(false)),
            attaches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// The call trace with feeds left out.
    pub fn control_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, Call::Feed(_)))
            .collect()
    }

    pub fn fed_bytes(&self) -> Vec<u8> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Feed(data) => Some(data),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn fail_feed(&self, fail: bool) {
        self.fail_feed.store(fail, Ordering::SeqCst);
    }

    pub fn attaches(&self) -> usize {
        self.attaches.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

pub struct FakeDevice {
    probe: Probe,
    volume: u8,
}

#[async_trait]
impl DecoderDevice for FakeDevice {
    async fn start_playing(&mut self) -> Result<(), DeviceError> {
        self.probe.record(Call::StartPlaying);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), DeviceError> {
        self.probe.record(Call::Stop);
        Ok(())
    }

    async fn volume_up(&mut self) -> Result<u8, DeviceError> {
        self.volume = (self.volume + 1).min(MAX_VOLUME);
        self.probe.record(Call::VolumeUp(self.volume));
        Ok(self.volume)
    }

    async fn volume_down(&mut self) -> Result<u8, DeviceError> {
        self.volume = self.volume.saturating_sub(1);
        self.probe.record(Call::VolumeDown(self.volume));
        Ok(self.volume)
    }

    fn volume(&self) -> u8 {
        self.volume
    }

    fn is_ready_for_data(&mut self) -> bool {
        self.probe.ready.load(Ordering::SeqCst)
    }

    async fn feed(&mut self, data: &[u8]) -> Result<(), DeviceError> {
        if self.probe.fail_feed.load(Ordering::SeqCst) {
            return Err(DeviceError::Bus("SPI transfer failed".to_string()));
        }
        self.probe.record(Call::Feed(data.to_vec()));
        Ok(())
    }
}

pub struct FakeLink {
    probe: Probe,
    volume: u8,
    fail: bool,
}

impl FakeLink {
    pub fn new(probe: &Probe) -> Self {
        Self {
            probe: probe.clone(),
            volume: 10,
            fail: false,
        }
    }

    pub fn with_volume(mut self, volume: u8) -> Self {
        self.volume = volume;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl DecoderLink for FakeLink {
    type Device = FakeDevice;

    async fn attach(self, _pins: PinConfig) -> Result<FakeDevice, DeviceError> {
        self.probe.attaches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DeviceError::NotReady);
        }
        Ok(FakeDevice {
            probe: self.probe,
            volume: self.volume,
        })
    }
}

/// A [`SimulatedDecoder`] that reports how many bytes it took for the last
/// file once that file is stopped.
pub struct MeteredDecoder {
    inner: SimulatedDecoder,
    last_total: Arc<AtomicU64>,
}

#[async_trait]
impl DecoderDevice for MeteredDecoder {
    async fn start_playing(&mut self) -> Result<(), DeviceError> {
        self.inner.start_playing().await
    }

    async fn stop(&mut self) -> Result<(), DeviceError> {
        self.last_total.store(self.inner.total_fed(), Ordering::SeqCst);
        self.inner.stop().await
    }

    async fn volume_up(&mut self) -> Result<u8, DeviceError> {
        self.inner.volume_up().await
    }

    async fn volume_down(&mut self) -> Result<u8, DeviceError> {
        self.inner.volume_down().await
    }

    fn volume(&self) -> u8 {
        self.inner.volume()
    }

    fn is_ready_for_data(&mut self) -> bool {
        self.inner.is_ready_for_data()
    }

    async fn feed(&mut self, data: &[u8]) -> Result<(), DeviceError> {
        self.inner.feed(data).await
    }
}

pub struct MeteredLink {
    inner: SimulatedLink,
    last_total: Arc<AtomicU64>,
}

impl MeteredLink {
    pub fn new(bitrate_kbps: u32) -> (Self, Arc<AtomicU64>) {
        let last_total = Arc::new(AtomicU64::new(0));
        let link = Self {
            inner: SimulatedLink::new(bitrate_kbps),
            last_total: last_total.clone(),
        };
        (link, last_total)
    }
}

#[async_trait]
impl DecoderLink for MeteredLink {
    type Device = MeteredDecoder;

    async fn attach(self, pins: PinConfig) -> Result<MeteredDecoder, DeviceError> {
        Ok(MeteredDecoder {
            inner: self.inner.attach(pins).await?,
            last_total: self.last_total,
        })
    }
}

pub fn test_config() -> PlayerConfig {
    PlayerConfig {
        queue_capacity: 16,
        chunk_size: 32,
        poll_interval_ms: 1,
        data_request_timeout_ms: 60_000,
        teardown_timeout_ms: 1000,
    }
}

pub fn store_with(files: &[(&str, usize)]) -> MemoryStore {
    files.iter().fold(MemoryStore::new(), |store, (path, len)| {
        let data: Vec<u8> = (0..*len).map(|i| (i % 251) as u8).collect();
        store.with_file(*path, data)
    })
}

pub struct Harness {
    pub player: Player,
    pub queue: QueueHandle,
    pub events: broadcast::Receiver<PlayerEvent>,
}

pub async fn start<L: DecoderLink, S: FileStore>(
    link: L,
    store: S,
    config: PlayerConfig,
) -> Harness {
    let mut player = Player::with_config(PinConfig::new(5, 16, 4), config);
    let events = player.subscribe();
    player.begin(None, link, store).await.unwrap();
    let queue = player.get_queue().unwrap();
    Harness {
        player,
        queue,
        events,
    }
}

pub async fn next_event(events: &mut broadcast::Receiver<PlayerEvent>) -> PlayerEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for a player event")
        .expect("event channel closed")
}

pub async fn wait_for_state(player: &Player, state: PlayerState) -> PlaybackStatus {
    let mut status = player.watch_status();
    let current = tokio::time::timeout(WAIT, status.wait_for(|s| s.state == state))
        .await
        .expect("timed out waiting for player state")
        .expect("status channel closed")
        .clone();
    current
}
