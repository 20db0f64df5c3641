//! Inbound webhook event classification and payload types.
//!
//! Only three event kinds matter to the relay:
//!
//! - GitHub `push` and `pull_request`: "upstream changed, sync the mirror".
//!   Neither payload is read; any change triggers the same full sync.
//! - GitLab `Pipeline Hook`: job statuses for one pipeline, relayed back to
//!   GitHub.
//!
//! Everything else is acknowledged and dropped.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{JobId, PipelineId, Sha};

/// The platform a webhook came from, taken from the route (`/{repo}/github`
/// or `/{repo}/gitlab`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    GitHub,
    GitLab,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::GitHub => f.write_str("github"),
            Platform::GitLab => f.write_str("gitlab"),
        }
    }
}

/// GitHub event names (`X-GitHub-Event`).
pub const GITHUB_PUSH: &str = "push";
pub const GITHUB_PULL_REQUEST: &str = "pull_request";

/// GitLab event name (`X-Gitlab-Event`) for pipeline updates.
pub const GITLAB_PIPELINE_HOOK: &str = "Pipeline Hook";

/// What an upstream change notification was.
///
/// Both kinds lead to the same mirror sync; the distinction is kept for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    Push,
    PullRequest,
    /// Worker bootstrap, not a webhook.
    Startup,
}

/// Where an event should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRoute {
    /// Enqueue a mirror sync.
    Mirror(SyncTrigger),
    /// Parse as a pipeline hook and enqueue a status event.
    Status,
    /// Acknowledge and drop.
    Ignore,
}

/// Decides the route for an event from its platform and kind header.
///
/// Kinds are matched exactly, as the platforms send them.
pub fn route_event(platform: Platform, kind: &str) -> EventRoute {
    match (platform, kind) {
        (Platform::GitHub, GITHUB_PUSH) => EventRoute::Mirror(SyncTrigger::Push),
        (Platform::GitHub, GITHUB_PULL_REQUEST) => EventRoute::Mirror(SyncTrigger::PullRequest),
        (Platform::GitLab, GITLAB_PIPELINE_HOOK) => EventRoute::Status,
        _ => EventRoute::Ignore,
    }
}

// ─── GitLab Pipeline Hook ────────────────────────────────────────────────────

/// The parts of a GitLab `Pipeline Hook` payload the relay reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PipelineHook {
    #[serde(default)]
    pub object_attributes: Option<PipelineAttributes>,
    pub commit: HookCommit,
    /// One entry per job ("build" in GitLab's older vocabulary).
    pub builds: Vec<HookBuild>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PipelineAttributes {
    pub id: PipelineId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HookCommit {
    pub id: Sha,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HookBuild {
    pub id: JobId,
    pub name: String,
    pub status: String,
}

impl PipelineHook {
    pub fn from_value(payload: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(payload)
    }

    pub fn pipeline_id(&self) -> Option<PipelineId> {
        self.object_attributes.as_ref().map(|a| a.id)
    }
}
