//! Effects-as-data for git, GitHub and GitLab operations.
//!
//! Workers never call `git` or an HTTP client directly. They build effect
//! values and pass them to interpreters. This gives:
//! - Workers that are testable against recording mock interpreters
//! - One place to apply retry/backoff ([`crate::retry`])
//! - Uniform logging of intended operations

pub mod git;
pub mod github;
pub mod gitlab;
pub mod interpreter;

pub use git::{
    GitEffect, GitResponse, MIRROR_ALL_REFSPEC, ORIGIN_FETCH_KEY, PULL_AS_BRANCH_REFSPEC,
    RefEntry,
};
pub use github::{GitHubEffect, GitHubResponse};
pub use gitlab::{GitLabEffect, GitLabResponse, JobCommit, JobData, PipelineSummary};
pub use interpreter::{GitHubInterpreter, GitInterpreter, GitLabInterpreter};
