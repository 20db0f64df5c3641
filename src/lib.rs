//! Mirror relay - keeps GitLab mirrors of GitHub repositories in sync and
//! reports GitLab CI results back to GitHub as commit statuses.
//!
//! Each configured repository pairing gets two independent workers: one
//! that mirrors upstream refs (including pull request heads) to the
//! downstream project, and one that relays pipeline job statuses upstream.

pub mod config;
pub mod effects;
pub mod git;
pub mod github;
pub mod gitlab;
pub mod retry;
pub mod server;
pub mod session;
pub mod status;
pub mod types;
pub mod webhooks;
pub mod worker;

#[cfg(test)]
pub mod test_utils;
