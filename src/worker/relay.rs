//! Status relay worker: turns GitLab job results into GitHub commit statuses.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::effects::{
    GitHubEffect, GitHubInterpreter, GitHubResponse, GitLabEffect, GitLabInterpreter,
    GitLabResponse, PipelineSummary,
};
use crate::retry::RetryConfig;
use crate::session::RepoSession;
use crate::status::CommitStatusUpdate;

use super::message::StatusEvent;
use super::{JOBS_PER_PAGE, WorkerError, WorkerSettings, execute_with_retry};

/// Lifecycle of a status relay worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Backfill has not finished; the queue is not being read.
    Uninitialized,
    /// Consuming status events.
    Ready,
}

/// Relays one repository's GitLab job statuses to GitHub.
pub struct StatusRelayWorker<H, L> {
    session: RepoSession,
    github: H,
    gitlab: L,
    settings: WorkerSettings,
    state: RelayState,
}

impl<H: GitHubInterpreter, L: GitLabInterpreter> StatusRelayWorker<H, L> {
    pub fn new(session: RepoSession, github: H, gitlab: L, settings: WorkerSettings) -> Self {
        StatusRelayWorker {
            session,
            github,
            gitlab,
            settings,
            state: RelayState::Uninitialized,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    async fn gitlab(
        &self,
        effect: GitLabEffect,
        retry: RetryConfig,
    ) -> Result<GitLabResponse, WorkerError> {
        execute_with_retry(effect.name(), retry, || self.gitlab.interpret(effect.clone())).await
    }

    async fn post_status(&self, update: CommitStatusUpdate) -> Result<(), WorkerError> {
        let effect = GitHubEffect::SetCommitStatus(update);
        let response = execute_with_retry(effect.name(), self.settings.item_retry, || {
            self.github.interpret(effect.clone())
        })
        .await?;

        let GitHubResponse::StatusCreated { id } = response;
        debug!(status_id = ?id, "Commit status created");
        Ok(())
    }

    /// Posts one update, logging and swallowing the failure.
    ///
    /// Returns whether the status reached GitHub.
    async fn post_or_skip(&self, update: CommitStatusUpdate) -> bool {
        let commit = update.commit.short().to_string();
        let context = update.context.clone();
        match self.post_status(update).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    repo = %self.session.name(),
                    commit = %commit,
                    context = %context,
                    error = %e,
                    "Failed to post commit status, skipping"
                );
                false
            }
        }
    }

    /// Replays the statuses of the most recently updated pipelines.
    ///
    /// Covers job results that were produced while the relay was not
    /// running. Returns the number of statuses posted.
    #[instrument(skip(self), fields(repo = %self.session.name()))]
    pub async fn bootstrap(&mut self) -> Result<usize, WorkerError> {
        let limit = self.settings.backfill_pipelines;
        if limit == 0 {
            info!("Backfill disabled");
            self.state = RelayState::Ready;
            return Ok(0);
        }

        let retry = self.settings.bootstrap_retry;
        let pipelines = match self
            .gitlab(GitLabEffect::ListRecentPipelines { per_page: limit }, retry)
            .await?
        {
            GitLabResponse::Pipelines(p) => p,
            other => return Err(WorkerError::unexpected("list_recent_pipelines", other)),
        };

        // Listed newest first; replay oldest first so the newest status wins
        let window: Vec<PipelineSummary> = pipelines.into_iter().take(limit as usize).collect();
        let mut posted = 0;
        for pipeline in window.iter().rev() {
            posted += self.backfill_pipeline(pipeline, retry).await?;
        }

        self.state = RelayState::Ready;
        info!(posted, "Status backfill complete");
        Ok(posted)
    }

    async fn backfill_pipeline(
        &self,
        pipeline: &PipelineSummary,
        retry: RetryConfig,
    ) -> Result<usize, WorkerError> {
        let effect = GitLabEffect::ListPipelineJobs {
            pipeline_id: pipeline.id,
            per_page: JOBS_PER_PAGE,
        };
        let jobs = match self.gitlab(effect, retry).await? {
            GitLabResponse::Jobs(jobs) => jobs,
            other => return Err(WorkerError::unexpected("list_pipeline_jobs", other)),
        };

        debug!(
            pipeline = %pipeline.id,
            commit = %pipeline.sha.short(),
            git_ref = pipeline.ref_name.as_deref().unwrap_or("-"),
            status = %pipeline.status,
            jobs = jobs.len(),
            "Backfilling pipeline"
        );

        let mut posted = 0;
        for job in jobs {
            let Some(update) = CommitStatusUpdate::for_job(
                self.session.job_descriptions(),
                &job.commit.id,
                &job.name,
                &job.status,
                job.web_url,
            ) else {
                continue;
            };
            if self.post_or_skip(update).await {
                posted += 1;
            }
        }
        Ok(posted)
    }

    /// Posts a status for each job in the event, in payload order.
    ///
    /// Jobs with unknown statuses and posts that fail are skipped. Returns the
    /// number of statuses posted.
    pub async fn apply_event(&self, event: StatusEvent) -> usize {
        debug!(
            repo = %self.session.name(),
            commit = %event.commit.short(),
            pipeline = ?event.pipeline,
            jobs = event.jobs.len(),
            "Relaying pipeline status"
        );

        let mut posted = 0;
        for job in event.jobs {
            let Some(update) = CommitStatusUpdate::for_job(
                self.session.job_descriptions(),
                &event.commit,
                &job.name,
                &job.status,
                job.target_url,
            ) else {
                continue;
            };
            if self.post_or_skip(update).await {
                posted += 1;
            }
        }
        posted
    }

    /// Backfills, then consumes status events until shutdown or until every
    /// sender is gone.
    ///
    /// Returns an error only when backfill cannot list GitLab pipelines or
    /// jobs; the receiver is dropped on return, which closes the queue.
    #[instrument(skip_all, fields(repo = %self.session.name()))]
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<StatusEvent>,
        shutdown: CancellationToken,
    ) -> Result<(), WorkerError> {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Shutdown during status backfill");
                return Ok(());
            }
            result = self.bootstrap() => {
                result?;
            }
        }

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received, stopping status relay");
                    break;
                }

                event = rx.recv() => {
                    let Some(event) = event else {
                        info!("Status queue closed");
                        break;
                    };
                    let expected = event.jobs.len();
                    let posted = self.apply_event(event).await;
                    if posted < expected {
                        warn!(posted, expected, "Some job statuses were not relayed");
                    }
                }
            }
        }

        Ok(())
    }
}
