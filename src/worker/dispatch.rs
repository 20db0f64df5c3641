//! Event dispatch: routes webhook events to per-repository queues.
//!
//! Every configured repository is registered up front with
//! [`Dispatcher::spawn_repo`], which creates its two queues and spawns its two
//! workers. Dispatch itself never touches git or the network; it only
//! decides which queue (if any) an event belongs in.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::effects::{GitHubInterpreter, GitInterpreter, GitLabInterpreter};
use crate::session::RepoSession;
use crate::types::RepoName;
use crate::webhooks::{EventRoute, PipelineHook, Platform, route_event};

use super::WorkerSettings;
use super::message::{MirrorTask, StatusEvent};
use super::mirror::MirrorWorker;
use super::queue::{EnqueueOutcome, MirrorQueue, StatusQueue};
use super::relay::StatusRelayWorker;

/// Which of a repository's queues an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Mirror,
    Status,
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueKind::Mirror => f.write_str("mirror"),
            QueueKind::Status => f.write_str("status"),
        }
    }
}

/// Errors returned to the caller of [`Dispatcher::dispatch`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No repository with this name is configured.
    #[error("unknown repository: {0}")]
    UnknownRepository(String),

    /// The worker behind the target queue has exited.
    #[error("{queue} worker for {repo} has stopped")]
    WorkerStopped { repo: RepoName, queue: QueueKind },
}

/// What happened to a dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Queued as a new item.
    Enqueued,
    /// Merged into an already pending mirror task.
    Coalesced,
    /// Not an event kind the relay acts on, or an unusable payload.
    Ignored,
}

impl From<EnqueueOutcome> for DispatchOutcome {
    fn from(outcome: EnqueueOutcome) -> Self {
        match outcome {
            EnqueueOutcome::Enqueued => DispatchOutcome::Enqueued,
            EnqueueOutcome::Coalesced => DispatchOutcome::Coalesced,
        }
    }
}

/// Queue handles for one repository.
#[derive(Clone)]
struct RepoHandles {
    session: RepoSession,
    mirror: MirrorQueue,
    status: StatusQueue,
}

/// Routes events to per-repository workers.
///
/// Shared across HTTP handler tasks behind an `Arc`.
pub struct Dispatcher {
    repos: RwLock<HashMap<RepoName, RepoHandles>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl Dispatcher {
    pub fn new(shutdown: CancellationToken) -> Self {
        Dispatcher {
            repos: RwLock::new(HashMap::new()),
            tasks: Mutex::new(Vec::new()),
            shutdown,
        }
    }

    /// Registers a repository and spawns its mirror and status workers.
    ///
    /// The queues exist before the workers start, so events dispatched while
    /// the workers are still bootstrapping are buffered.
    pub async fn spawn_repo<G, H, L>(
        &self,
        session: RepoSession,
        git: G,
        github: H,
        gitlab: L,
        settings: WorkerSettings,
    ) where
        G: GitInterpreter,
        H: GitHubInterpreter,
        L: GitLabInterpreter,
    {
        let name = session.name().clone();
        let (mirror, mirror_rx) = MirrorQueue::new();
        let (status, status_rx) = StatusQueue::new(settings.status_queue_capacity);

        let mirror_worker = MirrorWorker::new(session.clone(), git, settings);
        let relay_worker = StatusRelayWorker::new(session.clone(), github, gitlab, settings);

        let mirror_task = {
            let name = name.clone();
            let shutdown = self.shutdown.child_token();
            tokio::spawn(async move {
                if let Err(e) = mirror_worker.run(mirror_rx, shutdown).await {
                    error!(repo = %name, error = %e, "Mirror worker stopped");
                }
            })
        };

        let relay_task = {
            let name = name.clone();
            let shutdown = self.shutdown.child_token();
            tokio::spawn(async move {
                if let Err(e) = relay_worker.run(status_rx, shutdown).await {
                    error!(repo = %name, error = %e, "Status relay worker stopped");
                }
            })
        };

        self.tasks.lock().await.extend([mirror_task, relay_task]);

        debug!(repo = %name, "Spawned repository workers");
        let previous = self.repos.write().await.insert(
            name.clone(),
            RepoHandles {
                session,
                mirror,
                status,
            },
        );
        if previous.is_some() {
            warn!(repo = %name, "Repository registered twice, replacing queues");
        }
    }

    /// Returns the session for a configured repository.
    pub async fn session(&self, repo: &str) -> Option<RepoSession> {
        self.repos
            .read()
            .await
            .get(repo)
            .map(|handles| handles.session.clone())
    }

    async fn handles(&self, repo: &str) -> Result<RepoHandles, DispatchError> {
        self.repos
            .read()
            .await
            .get(repo)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownRepository(repo.to_string()))
    }

    /// Routes one webhook event.
    ///
    /// Mirror signals never wait. Status events wait for room when the
    /// repository's status queue is full.
    #[instrument(skip(self, payload), fields(repo = %repo, platform = %platform, kind = %kind))]
    pub async fn dispatch(
        &self,
        repo: &str,
        platform: Platform,
        kind: &str,
        payload: Value,
    ) -> Result<DispatchOutcome, DispatchError> {
        let handles = self.handles(repo).await?;

        match route_event(platform, kind) {
            EventRoute::Mirror(trigger) => {
                let outcome = handles
                    .mirror
                    .signal(MirrorTask { trigger })
                    .map_err(|_| DispatchError::WorkerStopped {
                        repo: handles.session.name().clone(),
                        queue: QueueKind::Mirror,
                    })?;
                debug!(?outcome, "Mirror task dispatched");
                Ok(outcome.into())
            }

            EventRoute::Status => {
                let hook = match PipelineHook::from_value(payload) {
                    Ok(hook) => hook,
                    Err(e) => {
                        warn!(error = %e, "Malformed pipeline hook, dropping");
                        return Ok(DispatchOutcome::Ignored);
                    }
                };
                let event = StatusEvent::from_hook(&handles.session, hook);
                let outcome = handles.status.push(event).await.map_err(|_| {
                    DispatchError::WorkerStopped {
                        repo: handles.session.name().clone(),
                        queue: QueueKind::Status,
                    }
                })?;
                debug!(?outcome, "Status event dispatched");
                Ok(outcome.into())
            }

            EventRoute::Ignore => {
                info!("Ignoring event");
                Ok(DispatchOutcome::Ignored)
            }
        }
    }

    /// Cancels every worker and waits for them to finish their in-flight
    /// item.
    pub async fn shutdown(&self) {
        info!("Shutting down all workers");
        self.shutdown.cancel();

        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Worker task panicked");
            }
        }
    }
}
