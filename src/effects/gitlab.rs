//! GitLab API effect types.
//!
//! GitLab is only queried, during status backfill. Effects are project-scoped:
//! the interpreter is constructed with the project path.

use serde::{Deserialize, Serialize};

use crate::types::{JobId, PipelineId, Sha};

/// A GitLab API effect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GitLabEffect {
    /// List the most recently updated pipelines, newest first.
    ListRecentPipelines { per_page: u32 },

    /// List the jobs of one pipeline.
    ListPipelineJobs {
        pipeline_id: PipelineId,
        per_page: u32,
    },
}

impl GitLabEffect {
    /// Short operation name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            GitLabEffect::ListRecentPipelines { .. } => "list_recent_pipelines",
            GitLabEffect::ListPipelineJobs { .. } => "list_pipeline_jobs",
        }
    }
}

/// A pipeline as listed by `GET /projects/:id/pipelines`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub id: PipelineId,
    pub sha: Sha,
    #[serde(rename = "ref", default)]
    pub ref_name: Option<String>,
    pub status: String,
}

/// A job as listed by `GET /projects/:id/pipelines/:pipeline_id/jobs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobData {
    pub id: JobId,
    pub name: String,
    /// Raw GitLab status; mapped later by the status mapper.
    pub status: String,
    pub web_url: String,
    pub commit: JobCommit,
}

/// The commit a job ran against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCommit {
    pub id: Sha,
}

/// Response from a GitLab effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitLabResponse {
    Pipelines(Vec<PipelineSummary>),
    Jobs(Vec<JobData>),
}
