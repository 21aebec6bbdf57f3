use crate::command::UpdateCommand;
use crossbeam_channel::{Receiver, SendTimeoutError, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Capacity and backpressure settings for an [`UpdateQueue`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueueConfig {
    /// Maximum queued commands. `None` or `Some(0)` means unbounded.
    pub capacity: Option<usize>,
    /// How long a producer waits on a full queue before giving up.
    pub enqueue_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: Some(16_384),
            enqueue_timeout: Duration::from_millis(50),
        }
    }
}

/// Why a command was not enqueued. The command is handed back either way.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnqueueError {
    /// The queue stayed full for the whole enqueue timeout. Retry later.
    #[error("update queue is full")]
    Full(UpdateCommand),
    /// The host is shutting down and no longer accepts commands.
    #[error("update queue is closed")]
    Closed(UpdateCommand),
}

impl EnqueueError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    pub fn into_command(self) -> UpdateCommand {
        match self {
            Self::Full(cmd) | Self::Closed(cmd) => cmd,
        }
    }
}

/// Producer handle. Cheap to clone and safe to share across worker threads.
#[derive(Debug, Clone)]
pub struct UpdateSender {
    tx: Sender<UpdateCommand>,
    closed: Arc<AtomicBool>,
    timeout: Duration,
}

impl UpdateSender {
    /// Queue a command for the next drain.
    ///
    /// Never blocks longer than the configured enqueue timeout. Commands
    /// from one sender are drained in the order they were enqueued.
    pub fn enqueue(&self, cmd: UpdateCommand) -> Result<(), EnqueueError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EnqueueError::Closed(cmd));
        }
        self.tx
            .send_timeout(cmd, self.timeout)
            .map_err(|err| match err {
                SendTimeoutError::Timeout(cmd) => EnqueueError::Full(cmd),
                SendTimeoutError::Disconnected(cmd) => EnqueueError::Closed(cmd),
            })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Multi-producer, single-consumer queue of pending world mutations.
///
/// The queue itself is the consumer end: it is not `Clone`, and only its
/// owner may drain it. Producers enqueue through [`UpdateSender`]s.
#[derive(Debug)]
pub struct UpdateQueue {
    sender: UpdateSender,
    rx: Receiver<UpdateCommand>,
}

impl UpdateQueue {
    pub fn new(config: QueueConfig) -> Self {
        let (tx, rx) = match config.capacity {
            Some(cap) if cap > 0 => crossbeam_channel::bounded(cap),
            _ => crossbeam_channel::unbounded(),
        };
        Self {
            sender: UpdateSender {
                tx,
                closed: Arc::new(AtomicBool::new(false)),
                timeout: config.enqueue_timeout,
            },
            rx,
        }
    }

    /// A new producer handle for this queue.
    pub fn sender(&self) -> UpdateSender {
        self.sender.clone()
    }

    /// Enqueue from the consumer side.
    pub fn enqueue(&self, cmd: UpdateCommand) -> Result<(), EnqueueError> {
        self.sender.enqueue(cmd)
    }

    /// Remove and return every command queued at the moment of the call,
    /// oldest first. Never waits; commands arriving mid-drain stay queued
    /// for the next call.
    pub fn drain_all(&self) -> Vec<UpdateCommand> {
        let pending = self.rx.len();
        let mut batch = Vec::with_capacity(pending);
        batch.extend(self.rx.try_iter().take(pending));
        batch
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Stop accepting new commands. Already queued commands remain drainable.
    pub fn close(&self) {
        self.sender.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl Default for UpdateQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}
