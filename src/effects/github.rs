//! GitHub API effect types.
//!
//! The relay only ever writes commit statuses to GitHub. Effects are
//! repo-scoped: the interpreter is constructed with a `RepoId`.

use serde::{Deserialize, Serialize};

use crate::status::CommitStatusUpdate;

/// A GitHub API effect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GitHubEffect {
    /// Create a commit status (`POST /repos/{owner}/{repo}/statuses/{sha}`).
    ///
    /// Posting the same state for the same context and commit twice is a
    /// no-op from GitHub's point of view, so this is safe to retry.
    SetCommitStatus(CommitStatusUpdate),
}

impl GitHubEffect {
    /// Short operation name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            GitHubEffect::SetCommitStatus(_) => "set_commit_status",
        }
    }
}

/// Response from a GitHub effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GitHubResponse {
    /// A commit status was created.
    StatusCreated {
        /// GitHub's ID for the status, when the response carried one.
        id: Option<u64>,
    },
}
