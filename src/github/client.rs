//! Octocrab client wrapper scoped to a specific repository.
//!
//! This module provides `OctocrabClient`, which wraps an `Octocrab` instance
//! and scopes all operations to a specific repository. This matches the design
//! where effects are repo-scoped (the `GitHubEffect` enum doesn't include repo info).

use octocrab::Octocrab;

use crate::types::{RepoId, Secret};

/// A GitHub API client scoped to a specific repository.
///
/// Cloning is cheap: `Octocrab` shares its HTTP connection pool between
/// clones.
#[derive(Clone)]
pub struct OctocrabClient {
    /// The underlying octocrab client.
    client: Octocrab,

    /// The repository this client is scoped to.
    repo: RepoId,
}

impl OctocrabClient {
    /// Creates a new client scoped to the given repository.
    pub fn new(client: Octocrab, repo: RepoId) -> Self {
        Self { client, repo }
    }

    /// Creates a client from a GitHub token.
    ///
    /// `api_url` overrides the API base (GitHub Enterprise, test stubs);
    /// `None` means `https://api.github.com`.
    pub fn from_token(
        token: &Secret,
        repo: RepoId,
        api_url: Option<&str>,
    ) -> Result<Self, octocrab::Error> {
        let mut builder = Octocrab::builder().personal_token(token.expose().to_string());
        if let Some(url) = api_url {
            builder = builder.base_uri(url)?;
        }
        Ok(Self::new(builder.build()?, repo))
    }

    /// Returns a reference to the underlying octocrab client.
    pub fn inner(&self) -> &Octocrab {
        &self.client
    }

    /// Returns the repository this client is scoped to.
    pub fn repo(&self) -> &RepoId {
        &self.repo
    }
}

impl std::fmt::Debug for OctocrabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctocrabClient")
            .field("repo", &self.repo)
            .finish_non_exhaustive()
    }
}
