//! Per-repository workers and the dispatcher that feeds them.
//!
//! Each configured repository gets two long-running tokio tasks:
//!
//! - a [`MirrorWorker`] that owns the repository's mirror working copy and
//!   syncs upstream to downstream whenever it is signalled, and
//! - a [`StatusRelayWorker`] that turns GitLab job results into GitHub commit
//!   statuses.
//!
//! # Architecture
//!
//! ```text
//!                                   ┌──────────────────────────────┐
//!                              ┌──► │ repo A mirror queue (cap 1)  │ ──► mirror worker A
//!                              │    ├──────────────────────────────┤
//! ┌─────────┐    ┌──────────┐  ├──► │ repo A status queue (FIFO)   │ ──► relay worker A
//! │  axum   │ ─► │ dispatch │ ─┤    └──────────────────────────────┘
//! └─────────┘    └──────────┘  │    ┌──────────────────────────────┐
//!                              ├──► │ repo B mirror queue (cap 1)  │ ──► mirror worker B
//!                              └──► │ repo B status queue (FIFO)   │ ──► relay worker B
//!                                   └──────────────────────────────┘
//! ```
//!
//! Every worker bootstraps before it reads its queue. Events that arrive
//! during bootstrap wait in the queue. Items within one queue never overlap;
//! nothing is ordered across queues or repositories.
//!
//! # Failure handling
//!
//! Effects are retried with backoff while their errors are transient. A
//! queue item whose effects still fail is logged and skipped, and the worker
//! carries on. A bootstrap that still fails after the (longer) bootstrap
//! retry schedule stops that one worker; its queue then reports
//! [`QueueClosed`] and the other repositories are unaffected.

mod dispatch;
mod message;
mod mirror;
mod queue;
mod relay;


use std::error::Error as StdError;
use std::future::Future;

use thiserror::Error;
use tracing::warn;

use crate::retry::{Retriable, RetryConfig, RetryResult, retry_with_backoff};

pub use dispatch::{DispatchError, DispatchOutcome, Dispatcher, QueueKind};
pub use message::{JobResult, MirrorTask, StatusEvent};
pub use mirror::{MirrorState, MirrorWorker};
pub use queue::{EnqueueOutcome, MirrorQueue, QueueClosed, StatusQueue};
pub use relay::{RelayState, StatusRelayWorker};

/// GitLab's maximum page size, used when listing a pipeline's jobs.
pub const JOBS_PER_PAGE: u32 = 100;

/// Settings shared by every repository's workers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerSettings {
    /// Capacity of each status queue.
    pub status_queue_capacity: usize,
    /// Recent pipelines replayed during relay bootstrap (0 disables).
    pub backfill_pipelines: u32,
    /// Retry schedule for effects of queue items (and backfill status posts).
    pub item_retry: RetryConfig,
    /// Retry schedule for bootstrap effects.
    pub bootstrap_retry: RetryConfig,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        WorkerSettings {
            status_queue_capacity: 256,
            backfill_pipelines: 5,
            item_retry: RetryConfig::DEFAULT,
            bootstrap_retry: RetryConfig::RECOVERY,
        }
    }
}

/// Errors from executing a worker's effects.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// An effect failed permanently or ran out of retries.
    #[error("{operation} failed: {source}")]
    Effect {
        operation: &'static str,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// An interpreter answered with the wrong kind of response.
    #[error("unexpected response to {operation}: {response}")]
    UnexpectedResponse {
        operation: &'static str,
        response: String,
    },
}

impl WorkerError {
    pub(crate) fn unexpected(operation: &'static str, response: impl std::fmt::Debug) -> Self {
        WorkerError::UnexpectedResponse {
            operation,
            response: format!("{response:?}"),
        }
    }
}

/// Runs one effect under `config`, converting the final failure into a
/// [`WorkerError`].
pub(crate) async fn execute_with_retry<T, E, F, Fut>(
    operation: &'static str,
    config: RetryConfig,
    run: F,
) -> Result<T, WorkerError>
where
    E: StdError + Retriable + Send + Sync + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    match retry_with_backoff(config, run).await {
        RetryResult::Success(value) => Ok(value),
        RetryResult::ExhaustedRetries {
            last_error,
            attempts,
        } => {
            warn!(operation, attempts, error = %last_error, "Giving up after retries");
            Err(WorkerError::Effect {
                operation,
                source: Box::new(last_error),
            })
        }
        RetryResult::PermanentError(e) => Err(WorkerError::Effect {
            operation,
            source: Box::new(e),
        }),
    }
}
