//! GitLab API client and effect interpreter.
//!
//! GitLab is read-only from the relay's point of view: recent pipelines and
//! their jobs are listed during status backfill. Live job updates arrive as
//! webhooks instead (see [`crate::webhooks`]).

mod client;
mod error;
mod interpreter;

pub use client::{GitLabClient, http_client};
pub use error::{GitLabApiError, GitLabErrorKind};
