//! Per-repository queue handles.
//!
//! Both queues are bounded `tokio::sync::mpsc` channels with a single
//! consumer (the worker), so items are handled one at a time in send order.
//!
//! - The mirror queue has room for exactly one pending task. Signalling while
//!   a task is already pending merges into it ([`EnqueueOutcome::Coalesced`]),
//!   so signalling never blocks.
//! - The status queue holds up to its configured capacity. When full,
//!   [`StatusQueue::push`] waits, which holds the webhook request open and
//!   pushes back on GitLab.
//!
//! Either queue reports [`QueueClosed`] once its worker has exited.

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::message::{MirrorTask, StatusEvent};

/// Room for one task behind the one being executed.
const MIRROR_QUEUE_CAPACITY: usize = 1;

/// The worker behind a queue has stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("queue closed: worker has stopped")]
pub struct QueueClosed;

/// What happened to an accepted item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// A new item was queued.
    Enqueued,
    /// Merged into an already pending mirror task.
    Coalesced,
}

/// Sending half of a repository's mirror queue.
#[derive(Debug, Clone)]
pub struct MirrorQueue {
    tx: mpsc::Sender<MirrorTask>,
}

impl MirrorQueue {
    pub fn new() -> (Self, mpsc::Receiver<MirrorTask>) {
        let (tx, rx) = mpsc::channel(MIRROR_QUEUE_CAPACITY);
        (MirrorQueue { tx }, rx)
    }

    /// Requests a sync, merging with a pending request if there is one.
    pub fn signal(&self, task: MirrorTask) -> Result<EnqueueOutcome, QueueClosed> {
        match self.tx.try_send(task) {
            Ok(()) => Ok(EnqueueOutcome::Enqueued),
            Err(TrySendError::Full(_)) => Ok(EnqueueOutcome::Coalesced),
            Err(TrySendError::Closed(_)) => Err(QueueClosed),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Sending half of a repository's status queue.
#[derive(Debug, Clone)]
pub struct StatusQueue {
    tx: mpsc::Sender<StatusEvent>,
}

impl StatusQueue {
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Configuration validation rejects that.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<StatusEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (StatusQueue { tx }, rx)
    }

    /// Appends an event, waiting for room if the queue is full.
    pub async fn push(&self, event: StatusEvent) -> Result<EnqueueOutcome, QueueClosed> {
        self.tx
            .send(event)
            .await
            .map(|()| EnqueueOutcome::Enqueued)
            .map_err(|_| QueueClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
