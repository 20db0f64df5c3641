//! Shared test utilities: recording interpreter mocks and generators.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;
use thiserror::Error;
use tokio::sync::Notify;

use crate::effects::{
    GitEffect, GitHubEffect, GitHubInterpreter, GitHubResponse, GitInterpreter, GitLabEffect,
    GitLabInterpreter, GitLabResponse, GitResponse, JobCommit, JobData, PipelineSummary, RefEntry,
};
use crate::retry::{Retriable, RetryConfig};
use crate::status::CommitStatusUpdate;
use crate::types::{JobId, PipelineId, Sha};
use crate::worker::WorkerSettings;

pub fn arb_sha() -> impl Strategy<Value = Sha> {
    "[0-9a-f]{40}".prop_map(|s| Sha::parse(s).unwrap())
}

pub fn sha(n: u32) -> Sha {
    Sha::new(format!("{n:040x}"))
}

/// Worker settings with millisecond backoff so retry paths run quickly.
pub fn fast_settings() -> WorkerSettings {
    let fast = RetryConfig::new(3, Duration::from_millis(1), Duration::from_millis(2), 2.0);
    WorkerSettings {
        status_queue_capacity: 16,
        backfill_pipelines: 5,
        item_retry: fast,
        bootstrap_retry: fast,
    }
}

/// Polls `condition` until it holds, panicking after five seconds.
pub async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Error returned by the mocks.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct MockError {
    pub message: String,
    pub retriable: bool,
}

impl MockError {
    pub fn transient(message: &str) -> Self {
        MockError {
            message: message.to_string(),
            retriable: true,
        }
    }

    pub fn permanent(message: &str) -> Self {
        MockError {
            message: message.to_string(),
            retriable: false,
        }
    }
}

impl Retriable for MockError {
    fn is_retriable(&self) -> bool {
        self.retriable
    }
}

/// Failure injection, gates and concurrency tracking shared by the mocks.
///
/// Behaviour is keyed by a string the mock chooses: the effect name for git
/// and GitLab, the status context for GitHub.
#[derive(Default)]
pub struct Behaviour {
    fail_next: Mutex<HashMap<String, VecDeque<MockError>>>,
    fail_always: Mutex<HashMap<String, MockError>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Behaviour {
    /// Fails the next call for `key` with `error`; queued failures are used
    /// in order.
    pub fn fail_next(&self, key: &str, error: MockError) {
        self.fail_next
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push_back(error);
    }

    /// Fails every call for `key`.
    pub fn fail_always(&self, key: &str, error: MockError) {
        self.fail_always
            .lock()
            .unwrap()
            .insert(key.to_string(), error);
    }

    /// Makes the next call for `key` wait until the returned `Notify` fires.
    pub fn gate(&self, key: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(key.to_string(), notify.clone());
        notify
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Highest number of calls observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, key: &str) -> Result<(), MockError> {
        let gate = self.gates.lock().unwrap().remove(key);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(error) = self
            .fail_next
            .lock()
            .unwrap()
            .get_mut(key)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }
        if let Some(error) = self.fail_always.lock().unwrap().get(key) {
            return Err(error.clone());
        }
        Ok(())
    }
}

// ─── Git ─────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct GitState {
    pub behaviour: Behaviour,
    attempts: Mutex<Vec<GitEffect>>,
    existing: AtomicBool,
}

/// Records every attempted git effect.
#[derive(Clone, Default)]
pub struct MockGit {
    pub state: Arc<GitState>,
}

impl MockGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `IsRepository` report an existing working copy.
    pub fn with_existing_repository(self) -> Self {
        self.state.existing.store(true, Ordering::SeqCst);
        self
    }

    pub fn behaviour(&self) -> &Behaviour {
        &self.state.behaviour
    }

    pub fn attempts(&self) -> Vec<GitEffect> {
        self.state.attempts.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.attempts().iter().filter(|e| e.name() == name).count()
    }
}

impl GitInterpreter for MockGit {
    type Error = MockError;

    fn interpret(
        &self,
        effect: GitEffect,
    ) -> impl Future<Output = Result<GitResponse, Self::Error>> + Send {
        let state = self.state.clone();
        async move {
            state.attempts.lock().unwrap().push(effect.clone());
            state.behaviour.enter(effect.name()).await?;
            Ok(match effect {
                GitEffect::IsRepository => GitResponse::Bool(state.existing.load(Ordering::SeqCst)),
                GitEffect::ShowRef => {
                    GitResponse::Refs(vec![RefEntry::new("refs/heads/main", &sha(1))])
                }
                _ => GitResponse::Ok,
            })
        }
    }
}

// ─── GitHub ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct GitHubState {
    pub behaviour: Behaviour,
    attempts: AtomicUsize,
    posted: Mutex<Vec<CommitStatusUpdate>>,
}

/// Records commit statuses that were posted successfully.
#[derive(Clone, Default)]
pub struct MockGitHub {
    pub state: Arc<GitHubState>,
}

impl MockGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn behaviour(&self) -> &Behaviour {
        &self.state.behaviour
    }

    pub fn posted(&self) -> Vec<CommitStatusUpdate> {
        self.state.posted.lock().unwrap().clone()
    }

    pub fn posted_count(&self) -> usize {
        self.state.posted.lock().unwrap().len()
    }

    pub fn attempts(&self) -> usize {
        self.state.attempts.load(Ordering::SeqCst)
    }
}

impl GitHubInterpreter for MockGitHub {
    type Error = MockError;

    fn interpret(
        &self,
        effect: GitHubEffect,
    ) -> impl Future<Output = Result<GitHubResponse, Self::Error>> + Send {
        let state = self.state.clone();
        async move {
            let GitHubEffect::SetCommitStatus(update) = effect;
            state.attempts.fetch_add(1, Ordering::SeqCst);
            state.behaviour.enter(&update.context).await?;
            let mut posted = state.posted.lock().unwrap();
            posted.push(update);
            Ok(GitHubResponse::StatusCreated {
                id: Some(posted.len() as u64),
            })
        }
    }
}

// ─── GitLab ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct GitLabState {
    pub behaviour: Behaviour,
    pipelines: Mutex<Vec<PipelineSummary>>,
    jobs: Mutex<HashMap<PipelineId, Vec<JobData>>>,
    attempts: Mutex<Vec<GitLabEffect>>,
}

/// Serves canned pipelines and jobs.
#[derive(Clone, Default)]
pub struct MockGitLab {
    pub state: Arc<GitLabState>,
}

impl MockGitLab {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn behaviour(&self) -> &Behaviour {
        &self.state.behaviour
    }

    /// Adds a pipeline on `commit` whose jobs have the given names and
    /// statuses. Pipelines are listed in the order they were added.
    pub fn add_pipeline(&self, id: u64, commit: &Sha, jobs: &[(&str, &str)]) {
        let pipeline_id = PipelineId(id);
        self.state.pipelines.lock().unwrap().push(PipelineSummary {
            id: pipeline_id,
            sha: commit.clone(),
            ref_name: Some("main".to_string()),
            status: "running".to_string(),
        });
        let jobs = jobs
            .iter()
            .enumerate()
            .map(|(n, (name, status))| {
                let job_id = id * 100 + n as u64;
                JobData {
                    id: JobId(job_id),
                    name: name.to_string(),
                    status: status.to_string(),
                    web_url: format!("https://gitlab.example.com/-/jobs/{job_id}"),
                    commit: JobCommit { id: commit.clone() },
                }
            })
            .collect();
        self.state.jobs.lock().unwrap().insert(pipeline_id, jobs);
    }

    pub fn attempts(&self) -> Vec<GitLabEffect> {
        self.state.attempts.lock().unwrap().clone()
    }
}

impl GitLabInterpreter for MockGitLab {
    type Error = MockError;

    fn interpret(
        &self,
        effect: GitLabEffect,
    ) -> impl Future<Output = Result<GitLabResponse, Self::Error>> + Send {
        let state = self.state.clone();
        async move {
            state.attempts.lock().unwrap().push(effect.clone());
            state.behaviour.enter(effect.name()).await?;
            Ok(match effect {
                GitLabEffect::ListRecentPipelines { per_page } => {
                    let pipelines = state.pipelines.lock().unwrap();
                    GitLabResponse::Pipelines(
                        pipelines.iter().take(per_page as usize).cloned().collect(),
                    )
                }
                GitLabEffect::ListPipelineJobs { pipeline_id, .. } => GitLabResponse::Jobs(
                    state
                        .jobs
                        .lock()
                        .unwrap()
                        .get(&pipeline_id)
                        .cloned()
                        .unwrap_or_default(),
                ),
            })
        }
    }
}
