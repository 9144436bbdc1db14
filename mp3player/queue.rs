use crate::error::PlayerError;
use crate::message::ControlMessage;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Bounded FIFO carrying [`ControlMessage`]s from any number of producers to the
/// player task.
#[derive(Debug)]
pub struct CommandQueue {
    handle: QueueHandle,
    inbox: Inbox,
}

impl CommandQueue {
    /// Creates a queue holding at most `capacity` pending messages.
    /// A capacity of zero is raised to one.
    pub fn bounded(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            handle: QueueHandle { sender },
            inbox: Inbox { receiver },
        }
    }

    pub fn handle(&self) -> QueueHandle {
        self.handle.clone()
    }

    pub fn capacity(&self) -> usize {
        self.handle.sender.max_capacity()
    }

    pub fn into_parts(self) -> (QueueHandle, Inbox) {
        (self.handle, self.inbox)
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::bounded(DEFAULT_QUEUE_CAPACITY)
    }
}

#[derive(Clone, Debug)]
pub struct QueueHandle {
    sender: mpsc::Sender<ControlMessage>,
}

impl QueueHandle {
    pub async fn enqueue(&self, msg: ControlMessage) -> Result<(), PlayerError> {
        self.sender.send(msg).await?;
        Ok(())
    }

    /// Enqueues without waiting. Fails with [`PlayerError::QueueFull`] when
    /// every slot is taken.
    pub fn try_enqueue(&self, msg: ControlMessage) -> Result<(), PlayerError> {
        self.sender.try_send(msg)?;
        Ok(())
    }

    pub async fn enqueue_timeout(
        &self,
        msg: ControlMessage,
        timeout: Duration,
    ) -> Result<(), PlayerError> {
        self.sender.send_timeout(msg, timeout).await?;
        Ok(())
    }

    /// Enqueue from a plain OS thread. Panics if called from async context.
    pub fn blocking_enqueue(&self, msg: ControlMessage) -> Result<(), PlayerError> {
        self.sender.blocking_send(msg)?;
        Ok(())
    }

    pub fn free_slots(&self) -> usize {
        self.sender.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub fn downgrade(&self) -> WeakQueueHandle {
        WeakQueueHandle {
            sender: self.sender.downgrade(),
        }
    }
}

/// A producer handle that does not keep the queue alive.
#[derive(Clone, Debug)]
pub struct WeakQueueHandle {
    sender: mpsc::WeakSender<ControlMessage>,
}

impl WeakQueueHandle {
    pub fn upgrade(&self) -> Option<QueueHandle> {
        self.sender.upgrade().map(|sender| QueueHandle { sender })
    }
}

/// Consumer side of a [`CommandQueue`]. Owned by the player task.
#[derive(Debug)]
pub struct Inbox {
    receiver: mpsc::Receiver<ControlMessage>,
}

impl Inbox {
    /// Waits for the next message. `None` once every producer is gone.
    pub async fn dequeue(&mut self) -> Option<ControlMessage> {
        self.receiver.recv().await
    }

    pub async fn dequeue_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<ControlMessage, PlayerError> {
        match tokio::time::timeout(timeout, self.receiver.recv()).await {
            Ok(Some(msg)) => Ok(msg),
            Ok(None) => Err(PlayerError::QueueClosed),
            Err(_) => Err(PlayerError::Timeout),
        }
    }

    /// Non-blocking poll. `Ok(None)` means nothing is pending.
    pub fn try_dequeue(&mut self) -> Result<Option<ControlMessage>, PlayerError> {
        match self.receiver.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(PlayerError::QueueClosed),
        }
    }

    pub fn drain(&mut self) -> usize {
        let mut dropped = 0;
        while self.receiver.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}
