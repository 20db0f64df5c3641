//! Git mirror worker: one per repository, sole owner of its working copy.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::effects::{
    GitEffect, GitInterpreter, GitResponse, MIRROR_ALL_REFSPEC, ORIGIN_FETCH_KEY,
    PULL_AS_BRANCH_REFSPEC,
};
use crate::retry::RetryConfig;
use crate::session::RepoSession;
use crate::webhooks::SyncTrigger;

use super::message::MirrorTask;
use super::{WorkerError, WorkerSettings, execute_with_retry};

/// Lifecycle of a mirror worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorState {
    /// The working copy may not exist yet; the queue is not being read.
    Uninitialized,
    /// Bootstrapped; consuming mirror tasks.
    Ready,
}

/// Keeps a bare mirror of the upstream repository and pushes it downstream.
pub struct MirrorWorker<G> {
    session: RepoSession,
    git: G,
    settings: WorkerSettings,
    state: MirrorState,
}

impl<G: GitInterpreter> MirrorWorker<G> {
    pub fn new(session: RepoSession, git: G, settings: WorkerSettings) -> Self {
        MirrorWorker {
            session,
            git,
            settings,
            state: MirrorState::Uninitialized,
        }
    }

    pub fn state(&self) -> MirrorState {
        self.state
    }

    async fn git(&self, effect: GitEffect, retry: RetryConfig) -> Result<GitResponse, WorkerError> {
        execute_with_retry(effect.name(), retry, || self.git.interpret(effect.clone())).await
    }

    /// Creates (or adopts) the working copy and runs the first sync.
    ///
    /// A working copy left by a previous run is reused: its origin URL and
    /// fetch refspecs are rewritten instead of cloning again.
    #[instrument(skip(self), fields(repo = %self.session.name()))]
    pub async fn bootstrap(&mut self) -> Result<(), WorkerError> {
        let retry = self.settings.bootstrap_retry;
        let upstream = self.session.upstream_clone_url();

        let existing = match self.git(GitEffect::IsRepository, retry).await? {
            GitResponse::Bool(b) => b,
            other => return Err(WorkerError::unexpected("is_repository", other)),
        };

        if existing {
            info!(path = %self.session.mirror_path().display(), "Reusing existing mirror");
            self.git(GitEffect::SetOriginUrl { url: upstream }, retry)
                .await?;
        } else {
            info!(
                path = %self.session.mirror_path().display(),
                upstream = %upstream,
                "Cloning mirror"
            );
            self.git(GitEffect::CloneMirror { url: upstream }, retry)
                .await?;
        }

        // --replace-all drops any refspecs left over from earlier runs
        self.git(
            GitEffect::ReplaceConfig {
                key: ORIGIN_FETCH_KEY.to_string(),
                value: MIRROR_ALL_REFSPEC.to_string(),
            },
            retry,
        )
        .await?;
        self.git(
            GitEffect::AddConfig {
                key: ORIGIN_FETCH_KEY.to_string(),
                value: PULL_AS_BRANCH_REFSPEC.to_string(),
            },
            retry,
        )
        .await?;

        self.sync_with(SyncTrigger::Startup, retry).await?;
        self.state = MirrorState::Ready;
        info!("Mirror ready");
        Ok(())
    }

    /// Fetches everything from upstream and mirror-pushes it downstream.
    pub async fn sync(&self, trigger: SyncTrigger) -> Result<(), WorkerError> {
        self.sync_with(trigger, self.settings.item_retry).await
    }

    async fn sync_with(&self, trigger: SyncTrigger, retry: RetryConfig) -> Result<(), WorkerError> {
        debug!(repo = %self.session.name(), ?trigger, "Syncing mirror");

        self.git(GitEffect::RemoteUpdate { prune: true }, retry)
            .await?;

        match self.git(GitEffect::ShowRef, retry).await? {
            GitResponse::Refs(refs) => {
                debug!(repo = %self.session.name(), refs = refs.len(), "Mirror refs")
            }
            other => return Err(WorkerError::unexpected("show_ref", other)),
        }

        let downstream = self.session.downstream_push_url();
        self.git(GitEffect::PushMirror { url: downstream }, retry)
            .await?;

        debug!(repo = %self.session.name(), ?trigger, "Mirror synced");
        Ok(())
    }

    /// Bootstraps, then consumes mirror tasks until shutdown or until every
    /// sender is gone.
    ///
    /// Returns an error only when bootstrap fails; the receiver is dropped on
    /// return, which closes the queue.
    #[instrument(skip_all, fields(repo = %self.session.name()))]
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<MirrorTask>,
        shutdown: CancellationToken,
    ) -> Result<(), WorkerError> {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Shutdown during mirror bootstrap");
                return Ok(());
            }
            result = self.bootstrap() => result?,
        }

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received, stopping mirror worker");
                    break;
                }

                task = rx.recv() => {
                    let Some(task) = task else {
                        info!("Mirror queue closed");
                        break;
                    };
                    if let Err(e) = self.sync(task.trigger).await {
                        error!(error = %e, trigger = ?task.trigger, "Mirror sync failed, skipping");
                    }
                }
            }
        }

        Ok(())
    }
}
