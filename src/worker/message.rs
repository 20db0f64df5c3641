//! Queue item types for the two per-repository workers.
//!
//! The two queues deliberately carry different item types. A [`MirrorTask`]
//! is a bare signal: one later sync observes every earlier upstream change,
//! so pending tasks can be merged. A [`StatusEvent`] carries job results that
//! each have to reach GitHub, so status events are never merged or dropped.

use crate::session::RepoSession;
use crate::types::{JobId, PipelineId, Sha};
use crate::webhooks::{PipelineHook, SyncTrigger};

/// "Bring the mirror and the downstream host up to date with upstream."
///
/// The trigger is informational only; every task does the same full sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorTask {
    pub trigger: SyncTrigger,
}

/// One job's status as reported by GitLab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub id: JobId,
    pub name: String,
    /// Raw GitLab status, mapped when the event is applied.
    pub status: String,
    /// Link for humans following the GitHub status back to GitLab.
    pub target_url: String,
}

/// "GitLab reported status for a commit."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub commit: Sha,
    pub pipeline: Option<PipelineId>,
    /// Job results in payload order.
    pub jobs: Vec<JobResult>,
}

impl StatusEvent {
    /// Builds an event from a pipeline hook, linking each job to its page on
    /// the session's GitLab host.
    pub fn from_hook(session: &RepoSession, hook: PipelineHook) -> Self {
        let pipeline = hook.pipeline_id();
        let jobs = hook
            .builds
            .into_iter()
            .map(|build| JobResult {
                target_url: session.job_url(build.id),
                id: build.id,
                name: build.name,
                status: build.status,
            })
            .collect();

        StatusEvent {
            commit: hook.commit.id,
            pipeline,
            jobs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::session;
    use serde_json::json;

    #[test]
    fn hook_jobs_link_to_job_pages() {
        let hook = PipelineHook::from_value(json!({
            "object_attributes": { "id": 9 },
            "commit": { "id": "a".repeat(40) },
            "builds": [
                { "id": 1, "name": "lint", "status": "success" },
                { "id": 2, "name": "unit-tests", "status": "running" }
            ]
        }))
        .unwrap();

        let event = StatusEvent::from_hook(&session("widgets"), hook);
        assert_eq!(event.pipeline, Some(PipelineId(9)));
        assert_eq!(event.jobs.len(), 2);
        assert_eq!(event.jobs[0].name, "lint");
        assert_eq!(
            event.jobs[1].target_url,
            "https://gitlab.example.com/mirrors/widgets/-/jobs/2"
        );
    }
}
