//! Translation from GitLab job statuses to GitHub commit statuses.
//!
//! GitLab reports a job as one of a dozen or so states; GitHub commit statuses
//! accept only `error`, `failure`, `pending` and `success`. The relay maps the
//! subset of GitLab states it understands and drops everything else:
//!
//! | GitLab job status                 | GitHub commit status |
//! |-----------------------------------|----------------------|
//! | `success`                         | `success`            |
//! | `pending`, `created`, `running`   | `pending`            |
//! | `failed`                          | `failure`            |
//! | anything else                     | *(dropped)*          |
//!
//! Matching is exact and case-sensitive. Unknown statuses are not errors: the
//! GitLab vocabulary grows over time and an unfamiliar value must not stall a
//! relay queue.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::Sha;

/// Prefix for the commit status context, followed by the job name.
pub const STATUS_CONTEXT_PREFIX: &str = "gitlab/";

/// A GitHub commit status state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Success,
    Pending,
    Failure,
}

impl CommitState {
    /// Returns the value GitHub expects in the `state` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitState::Success => "success",
            CommitState::Pending => "pending",
            CommitState::Failure => "failure",
        }
    }
}

impl fmt::Display for CommitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a GitLab job status to a GitHub commit state.
///
/// Returns `None` for statuses outside the mapped set.
pub fn map_ci_status(status: &str) -> Option<CommitState> {
    match status {
        "success" => Some(CommitState::Success),
        "pending" | "created" | "running" => Some(CommitState::Pending),
        "failed" => Some(CommitState::Failure),
        _ => None,
    }
}

/// The description used when no override is configured for a job.
pub fn default_description(job_name: &str) -> String {
    format!("Gitlab {}", job_name)
}

/// Resolves the human-readable description for a job.
pub fn describe_job(overrides: &HashMap<String, String>, job_name: &str) -> String {
    overrides
        .get(job_name)
        .cloned()
        .unwrap_or_else(|| default_description(job_name))
}

/// A commit status ready to be posted to GitHub.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitStatusUpdate {
    /// The commit the status is attached to.
    pub commit: Sha,
    /// Namespaced context, `gitlab/<job-name>`.
    pub context: String,
    pub state: CommitState,
    pub description: String,
    /// Link to the job on GitLab.
    pub target_url: String,
}

impl CommitStatusUpdate {
    /// Builds the update for one job result.
    ///
    /// Returns `None` (and logs a warning) when `status` is not a mapped
    /// GitLab status.
    pub fn for_job(
        overrides: &HashMap<String, String>,
        commit: &Sha,
        job_name: &str,
        status: &str,
        target_url: impl Into<String>,
    ) -> Option<Self> {
        let Some(state) = map_ci_status(status) else {
            warn!(
                commit = %commit.short(),
                job = %job_name,
                status = %status,
                "Unknown job status, not updating"
            );
            return None;
        };

        Some(CommitStatusUpdate {
            commit: commit.clone(),
            context: format!("{}{}", STATUS_CONTEXT_PREFIX, job_name),
            state,
            description: describe_job(overrides, job_name),
            target_url: target_url.into(),
        })
    }
}
