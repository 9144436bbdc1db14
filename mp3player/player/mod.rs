pub mod status;
mod task;

pub use status::{PlaybackStatus, PlayerEvent, PlayerState, StopReason};

use crate::config::{PinConfig, PlayerConfig};
use crate::device::DecoderLink;
use crate::error::PlayerError;
use crate::queue::{CommandQueue, QueueHandle};
use crate::store::FileStore;
use log::{error, info, warn};
use task::PlayerTask;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

const EVENT_CAPACITY: usize = 64;

/// Owner of a decoder playback task.
///
/// Construction only records the pin assignment. [`Player::begin`] attaches the
/// decoder and spawns the task; from then on the decoder is reachable only
/// through the command queue returned by [`Player::get_queue`].
///
/// ```no_run
/// # use mp3player::{Player, PinConfig, ControlMessage, SimulatedLink, DirStore};
/// # async fn run() -> Result<(), mp3player::PlayerError> {
/// let mut player = Player::new(PinConfig::new(5, 16, 4));
/// player.begin(None, SimulatedLink::new(128), DirStore::new("/sdcard")).await?;
///
/// let queue = player.get_queue().ok_or(mp3player::PlayerError::NotStarted)?;
/// queue.enqueue(ControlMessage::play_file("track1.mp3")).await?;
///
/// player.shutdown().await
/// # }
/// ```
pub struct Player {
    pins: PinConfig,
    config: PlayerConfig,
    queue: Option<QueueHandle>,
    task: Option<JoinHandle<()>>,
    shutdown: Option<watch::Sender<bool>>,
    status_tx: Option<watch::Sender<PlaybackStatus>>,
    status_rx: watch::Receiver<PlaybackStatus>,
    events: broadcast::Sender<PlayerEvent>,
}

impl Player {
    pub fn new(pins: PinConfig) -> Self {
        Self::with_config(pins, PlayerConfig::default())
    }

    pub fn with_config(pins: PinConfig, config: PlayerConfig) -> Self {
        let (status_tx, status_rx) = watch::channel(PlaybackStatus::idle(0));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            pins,
            config,
            queue: None,
            task: None,
            shutdown: None,
            status_tx: Some(status_tx),
            status_rx,
            events,
        }
    }

    /// Binds the command queue, attaches the decoder and spawns the player
    /// task. `None` allocates a queue of the configured capacity.
    ///
    /// Calling this twice fails with [`PlayerError::AlreadyStarted`]. When the
    /// decoder cannot be attached this returns
    /// [`PlayerError::DeviceAttachFailed`], yet the queue stays usable: the task
    /// still runs and rejects every command it receives.
    pub async fn begin<L, S>(
        &mut self,
        queue: Option<CommandQueue>,
        link: L,
        store: S,
    ) -> Result<(), PlayerError>
    where
        L: DecoderLink,
        S: FileStore,
    {
        let Some(status_tx) = self.status_tx.take() else {
            warn!("Player already started, ignoring begin");
            return Err(PlayerError::AlreadyStarted);
        };

        let queue = queue.unwrap_or_else(|| CommandQueue::bounded(self.config.queue_capacity));
        let (handle, inbox) = queue.into_parts();
        self.queue = Some(handle);

        let (device, result) = match link.attach(self.pins).await {
            Ok(device) => {
                info!(
                    "Decoder attached (XCS={}, XDCS={}, DREQ={})",
                    self.pins.cs, self.pins.dcs, self.pins.dreq
                );
                (Some(device), Ok(()))
            }
            Err(e) => {
                error!("Failed to attach decoder: {}", e);
                (None, Err(PlayerError::DeviceAttachFailed(e.to_string())))
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = PlayerTask::new(
            device,
            store,
            inbox,
            shutdown_rx,
            status_tx,
            self.events.clone(),
            self.config.clone(),
        );
        self.task = Some(tokio::spawn(task.run()));
        self.shutdown = Some(shutdown_tx);

        result
    }

    /// `None` before [`Player::begin`] and after [`Player::shutdown`].
    pub fn get_queue(&self) -> Option<QueueHandle> {
        self.queue.clone()
    }

    pub fn pins(&self) -> PinConfig {
        self.pins
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status_rx.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<PlaybackStatus> {
        self.status_rx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops playback, waits for the task to exit and releases the queue.
    ///
    /// The wait is bounded by the configured teardown timeout; a task that
    /// overruns it is aborted. Calling this again is a no-op.
    pub async fn shutdown(&mut self) -> Result<(), PlayerError> {
        let Some(mut task) = self.task.take() else {
            return Ok(());
        };
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }

        let timeout = self.config.teardown_timeout();
        let result = match tokio::time::timeout(timeout, &mut task).await {
            Ok(joined) => joined.map_err(PlayerError::from),
            Err(_) => {
                task.abort();
                error!("Player task did not stop in time, aborted");
                Err(PlayerError::TeardownTimeout(self.config.teardown_timeout_ms))
            }
        };

        self.queue = None;
        info!("Player shut down");
        result
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        // Signal only; the task closes the file and stops the decoder itself.
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
    }
}
