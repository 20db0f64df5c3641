//! Effect interpreter traits.
//!
//! Workers describe what they want done as effects and hand them to an
//! interpreter. Production interpreters run `git` ([`crate::git::LocalGit`]),
//! call GitHub ([`crate::github::OctocrabClient`]) and call GitLab
//! ([`crate::gitlab::GitLabClient`]); tests substitute recording mocks.
//!
//! Each interpreter's error type classifies itself through [`Retriable`], which
//! is how workers decide whether to back off and try again.

use std::future::Future;

use crate::retry::Retriable;

use super::git::{GitEffect, GitResponse};
use super::github::{GitHubEffect, GitHubResponse};
use super::gitlab::{GitLabEffect, GitLabResponse};

/// Interprets Git effects against a repository's local mirror.
///
/// Implementations are constructed with the mirror path, so all effects
/// executed through a single interpreter instance operate on that copy.
///
/// # Example (mock for testing)
///
/// ```ignore
/// struct MockGit {
///     log: Arc<Mutex<Vec<GitEffect>>>,
/// }
///
/// impl GitInterpreter for MockGit {
///     type Error = MockError;
///
///     async fn interpret(&self, effect: GitEffect) -> Result<GitResponse, Self::Error> {
///         self.log.lock().unwrap().push(effect);
///         Ok(GitResponse::Ok)
///     }
/// }
/// ```
pub trait GitInterpreter: Send + Sync + 'static {
    /// The error type returned by this interpreter.
    type Error: std::error::Error + Retriable + Send + Sync + 'static;

    /// Execute a Git effect and return its response.
    fn interpret(
        &self,
        effect: GitEffect,
    ) -> impl Future<Output = Result<GitResponse, Self::Error>> + Send;
}

/// Interprets GitHub effects against the GitHub API.
///
/// Implementations are constructed with a `RepoId`, so all effects executed
/// through a single interpreter instance are scoped to that repository.
pub trait GitHubInterpreter: Send + Sync + 'static {
    /// The error type returned by this interpreter.
    type Error: std::error::Error + Retriable + Send + Sync + 'static;

    /// Execute a GitHub effect and return its response.
    fn interpret(
        &self,
        effect: GitHubEffect,
    ) -> impl Future<Output = Result<GitHubResponse, Self::Error>> + Send;
}

/// Interprets GitLab effects against the GitLab API.
///
/// Implementations are constructed with a project path, so all effects
/// executed through a single interpreter instance are scoped to that project.
pub trait GitLabInterpreter: Send + Sync + 'static {
    /// The error type returned by this interpreter.
    type Error: std::error::Error + Retriable + Send + Sync + 'static;

    /// Execute a GitLab effect and return its response.
    fn interpret(
        &self,
        effect: GitLabEffect,
    ) -> impl Future<Output = Result<GitLabResponse, Self::Error>> + Send;
}
