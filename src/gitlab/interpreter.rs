//! GitLab effect interpreter.

use tracing::debug;

use crate::effects::{GitLabEffect, GitLabInterpreter, GitLabResponse, JobData, PipelineSummary};

use super::client::GitLabClient;
use super::error::GitLabApiError;

impl GitLabInterpreter for GitLabClient {
    type Error = GitLabApiError;

    async fn interpret(&self, effect: GitLabEffect) -> Result<GitLabResponse, Self::Error> {
        debug!(project = %self.project(), op = effect.name(), "GitLab effect");

        match effect {
            GitLabEffect::ListRecentPipelines { per_page } => {
                let mut url = self.project_url(&["pipelines"])?;
                url.query_pairs_mut()
                    .append_pair("pagination", "keyset")
                    .append_pair("order_by", "updated_at")
                    .append_pair("sort", "desc")
                    .append_pair("per_page", &per_page.to_string());
                let pipelines: Vec<PipelineSummary> = self.get_json(url).await?;
                Ok(GitLabResponse::Pipelines(pipelines))
            }

            GitLabEffect::ListPipelineJobs {
                pipeline_id,
                per_page,
            } => {
                let id = pipeline_id.to_string();
                let mut url = self.project_url(&["pipelines", &id, "jobs"])?;
                url.query_pairs_mut()
                    .append_pair("per_page", &per_page.to_string());
                let jobs: Vec<JobData> = self.get_json(url).await?;
                Ok(GitLabResponse::Jobs(jobs))
            }
        }
    }
}
