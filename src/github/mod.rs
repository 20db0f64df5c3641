//! GitHub API client and effect interpreter.
//!
//! The relay's only write to GitHub is creating commit statuses. This module
//! implements the `GitHubInterpreter` trait for that via the octocrab library.

mod client;
mod error;
mod interpreter;

pub use client::OctocrabClient;
pub use error::{GitHubApiError, GitHubErrorKind};
