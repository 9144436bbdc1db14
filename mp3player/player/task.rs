use super::status::{PlaybackStatus, PlayerEvent, PlayerState, StopReason};
use crate::config::PlayerConfig;
use crate::device::DecoderDevice;
use crate::error::StoreError;
use crate::message::{ControlMessage, PlayerCommand};
use crate::queue::Inbox;
use crate::store::{AudioStream, FileStore};
use log::{debug, error, info, warn};
use tokio::io::AsyncReadExt;
use tokio::sync::{broadcast, watch};

struct Playback {
    path: String,
    stream: AudioStream,
}

enum Step {
    Shutdown,
    Message(Option<ControlMessage>),
    DataRequest { ready: bool },
}

/// The background side of a player: owns the decoder and the open file, and
/// is the only code that ever touches either.
pub(crate) struct PlayerTask<D, S> {
    device: Option<D>,
    store: S,
    inbox: Inbox,
    shutdown: watch::Receiver<bool>,
    status: watch::Sender<PlaybackStatus>,
    events: broadcast::Sender<PlayerEvent>,
    config: PlayerConfig,
    current: Option<Playback>,
    buffer: Vec<u8>,
}

impl<D: DecoderDevice, S: FileStore> PlayerTask<D, S> {
    pub(crate) fn new(
        device: Option<D>,
        store: S,
        inbox: Inbox,
        shutdown: watch::Receiver<bool>,
        status: watch::Sender<PlaybackStatus>,
        events: broadcast::Sender<PlayerEvent>,
        config: PlayerConfig,
    ) -> Self {
        let volume = device.as_ref().map_or(0, DecoderDevice::volume);
        status.send_replace(PlaybackStatus::idle(volume));
        let buffer = vec![0u8; config.chunk_size.max(1)];

        Self {
            device,
            store,
            inbox,
            shutdown,
            status,
            events,
            config,
            current: None,
            buffer,
        }
    }

    pub(crate) async fn run(mut self) {
        info!("Player task started");

        loop {
            let step = if self.current.is_some() {
                self.next_step_playing().await
            } else {
                self.next_step_idle().await
            };

            match step {
                Step::Shutdown => {
                    info!("Player task shutdown requested");
                    break;
                }
                Step::Message(Some(msg)) => self.dispatch(msg).await,
                Step::Message(None) => {
                    info!("Command queue closed");
                    break;
                }
                Step::DataRequest { ready } => self.pump(ready).await,
            }
        }

        self.finish(StopReason::Shutdown).await;
        let dropped = self.inbox.drain();
        if dropped > 0 {
            warn!("Dropped {} pending commands on shutdown", dropped);
        }
        info!("Player task exited");
    }

    async fn next_step_idle(&mut self) -> Step {
        tokio::select! {
            biased;
            () = shutdown_requested(&mut self.shutdown) => Step::Shutdown,
            msg = self.inbox.dequeue() => Step::Message(msg),
        }
    }

    /// Pending commands win over feeding the decoder.
    async fn next_step_playing(&mut self) -> Step {
        let Some(device) = self.device.as_mut() else {
            return self.next_step_idle().await;
        };
        let poll_interval = self.config.poll_interval();
        let timeout = self.config.data_request_timeout();

        tokio::select! {
            biased;
            () = shutdown_requested(&mut self.shutdown) => Step::Shutdown,
            msg = self.inbox.dequeue() => Step::Message(msg),
            waited = tokio::time::timeout(timeout, device.wait_for_data_request(poll_interval)) => {
                Step::DataRequest { ready: waited.is_ok() }
            }
        }
    }

    async fn dispatch(&mut self, msg: ControlMessage) {
        if self.device.is_none() {
            warn!("Decoder unavailable, dropping {} command", msg.command);
            self.emit(PlayerEvent::CommandIgnored {
                command: msg.command.into(),
            });
            return;
        }

        match msg.command {
            PlayerCommand::PlayFile => match msg.file_path {
                Some(path) => self.play(path).await,
                None => {
                    warn!("Player command: PLAY FILE without a path, ignored");
                    self.emit(PlayerEvent::CommandIgnored {
                        command: msg.command.into(),
                    });
                }
            },
            PlayerCommand::Stop => {
                info!("Player command: STOP");
                if self.current.is_some() {
                    self.finish(StopReason::Command).await;
                } else {
                    debug!("Already idle");
                }
            }
            PlayerCommand::VolumeUp => {
                info!("Player command: VOLUME UP");
                self.change_volume(true).await;
            }
            PlayerCommand::VolumeDown => {
                info!("Player command: VOLUME DOWN");
                self.change_volume(false).await;
            }
            PlayerCommand::Unknown => {
                warn!("Player command: UNKNOWN, ignored");
                self.emit(PlayerEvent::CommandIgnored {
                    command: msg.command.into(),
                });
            }
        }
    }

    async fn play(&mut self, path: String) {
        info!("Player command: PLAY FILE {}", path);
        self.finish(StopReason::Replaced).await;

        let stream = match self.store.open(&path).await {
            Ok(stream) => stream,
            Err(StoreError::NotFound(_)) => {
                warn!("File not found: {}", path);
                self.emit(PlayerEvent::FileNotFound { path });
                return;
            }
            Err(e) => {
                error!("Failed to open {}: {}", path, e);
                self.emit(PlayerEvent::FileOpenFailed {
                    path,
                    reason: e.to_string(),
                });
                return;
            }
        };

        let Some(device) = self.device.as_mut() else {
            return;
        };
        if let Err(e) = device.start_playing().await {
            error!("Decoder refused to start {}: {}", path, e);
            self.emit(PlayerEvent::DeviceFault {
                reason: e.to_string(),
            });
            return;
        }

        self.current = Some(Playback {
            path: path.clone(),
            stream,
        });
        self.publish(PlayerState::Playing, Some(path.clone()));
        self.emit(PlayerEvent::Started { path });
    }

    /// Moves one chunk from the open file to the decoder.
    async fn pump(&mut self, ready: bool) {
        if !ready {
            error!("Decoder data request timed out");
            self.emit(PlayerEvent::DeviceFault {
                reason: "data request timeout".to_string(),
            });
            self.finish(StopReason::DeviceError).await;
            return;
        }

        let Some(playback) = self.current.as_mut() else {
            return;
        };
        let n = match playback.stream.read(&mut self.buffer).await {
            Ok(n) => n,
            Err(e) => {
                let error = StoreError::Read(e.to_string());
                let path = playback.path.clone();
                error!("Failed to read {}: {}", path, error);
                self.emit(PlayerEvent::FileReadFailed {
                    path,
                    reason: error.to_string(),
                });
                self.finish(StopReason::ReadError).await;
                return;
            }
        };
        if n == 0 {
            self.finish(StopReason::EndOfStream).await;
            return;
        }

        let Some(device) = self.device.as_mut() else {
            return;
        };
        if let Err(e) = device.feed(&self.buffer[..n]).await {
            error!("Feeding decoder failed: {}", e);
            self.emit(PlayerEvent::DeviceFault {
                reason: e.to_string(),
            });
            self.finish(StopReason::DeviceError).await;
            return;
        }

        tokio::task::yield_now().await;
    }

    /// Closes the current file and returns to idle. Does nothing when idle.
    async fn finish(&mut self, reason: StopReason) {
        let Some(Playback { path, stream }) = self.current.take() else {
            return;
        };
        self.publish(PlayerState::Stopping, Some(path.clone()));
        drop(stream);

        if let Some(device) = self.device.as_mut() {
            if let Err(e) = device.stop().await {
                error!("Failed to stop decoder: {}", e);
            }
        }

        info!("Stopped {} ({:?})", path, reason);
        self.publish(PlayerState::Idle, None);
        self.emit(PlayerEvent::Stopped { path, reason });
    }

    async fn change_volume(&mut self, up: bool) {
        let Some(device) = self.device.as_mut() else {
            return;
        };
        let result = if up {
            device.volume_up().await
        } else {
            device.volume_down().await
        };

        match result {
            Ok(volume) => {
                debug!("Volume {}", volume);
                self.status.send_modify(|status| status.volume = volume);
                self.emit(PlayerEvent::VolumeChanged { volume });
            }
            Err(e) => {
                error!("Failed to change volume: {}", e);
                self.emit(PlayerEvent::DeviceFault {
                    reason: e.to_string(),
                });
            }
        }
    }

    fn publish(&self, state: PlayerState, file: Option<String>) {
        self.status.send_modify(|status| {
            status.state = state;
            status.file = file;
        });
    }

    fn emit(&self, event: PlayerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Resolves once shutdown is signalled or the signalling side is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
