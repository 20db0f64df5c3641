//! Core domain types shared across the relay.

pub mod ids;
pub mod secret;

pub use ids::{InvalidRepoId, InvalidSha, JobId, PipelineId, RepoId, RepoName, Sha};
pub use secret::{RemoteUrl, Secret};
