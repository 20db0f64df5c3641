//! GitHub effect interpreter using octocrab.
//!
//! Each call is a single attempt. Retrying is the worker's decision, made
//! through [`crate::retry::retry_with_backoff`] on the error's kind.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse};
use crate::status::{CommitState, CommitStatusUpdate};
use crate::types::{RepoId, Sha};

use super::client::OctocrabClient;
use super::error::GitHubApiError;

/// Body of `POST /repos/{owner}/{repo}/statuses/{sha}`.
#[derive(Debug, Serialize)]
pub(crate) struct StatusRequest<'a> {
    state: CommitState,
    target_url: &'a str,
    description: &'a str,
    context: &'a str,
}

impl<'a> From<&'a CommitStatusUpdate> for StatusRequest<'a> {
    fn from(update: &'a CommitStatusUpdate) -> Self {
        StatusRequest {
            state: update.state,
            target_url: &update.target_url,
            description: &update.description,
            context: &update.context,
        }
    }
}

/// The fields of the created status we care about.
#[derive(Debug, Deserialize)]
struct StatusCreated {
    id: Option<u64>,
}

pub(crate) fn status_route(repo: &RepoId, sha: &Sha) -> String {
    format!("/repos/{}/{}/statuses/{}", repo.owner, repo.repo, sha)
}

impl GitHubInterpreter for OctocrabClient {
    type Error = GitHubApiError;

    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, Self::Error> {
        match effect {
            GitHubEffect::SetCommitStatus(update) => set_commit_status(self, &update).await,
        }
    }
}

async fn set_commit_status(
    client: &OctocrabClient,
    update: &CommitStatusUpdate,
) -> Result<GitHubResponse, GitHubApiError> {
    let route = status_route(client.repo(), &update.commit);
    debug!(
        repo = %client.repo(),
        commit = %update.commit.short(),
        context = %update.context,
        state = %update.state,
        "Setting commit status"
    );

    let result: Result<StatusCreated, _> = client
        .inner()
        .post(&route, Some(&StatusRequest::from(update)))
        .await;

    match result {
        Ok(created) => Ok(GitHubResponse::StatusCreated { id: created.id }),
        Err(e) => Err(GitHubApiError::from_octocrab(e)),
    }
}
