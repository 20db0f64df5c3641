//! Per-repository session: the immutable pairing of one upstream GitHub
//! repository with one downstream GitLab project.
//!
//! A session is built once from configuration and shared read-only by the
//! repository's mirror worker, its status relay worker and the webhook
//! gateway. Cloning a [`RepoSession`] clones an `Arc`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Url;

use crate::types::{JobId, RemoteUrl, RepoId, RepoName, Secret};

/// Username GitLab expects alongside an access token in HTTPS git URLs.
const GITLAB_TOKEN_USER: &str = "oauth2";

/// The GitHub side of a pairing.
#[derive(Debug, Clone)]
pub struct UpstreamEndpoint {
    pub repo: RepoId,
    pub token: Secret,
    /// API base override; `None` means `https://api.github.com`.
    pub api_url: Option<String>,
    /// URL the mirror is cloned and fetched from.
    pub clone_url: String,
    /// HMAC secret for `X-Hub-Signature-256`, if webhooks are signed.
    pub webhook_secret: Option<Secret>,
}

/// The GitLab side of a pairing.
#[derive(Debug, Clone)]
pub struct DownstreamEndpoint {
    /// Host name, e.g. `gitlab.example.com`.
    pub host: String,
    /// Project path, e.g. `group/project`.
    pub project: String,
    pub token: Secret,
    /// REST API root, e.g. `https://gitlab.example.com/api/v4/`.
    pub api_url: Url,
    /// Expected `X-Gitlab-Token`, if webhooks carry one.
    pub webhook_token: Option<Secret>,
}

#[derive(Debug)]
struct SessionInner {
    name: RepoName,
    upstream: UpstreamEndpoint,
    downstream: DownstreamEndpoint,
    mirror_path: PathBuf,
    job_descriptions: HashMap<String, String>,
}

/// One configured repository pairing.
#[derive(Debug, Clone)]
pub struct RepoSession {
    inner: Arc<SessionInner>,
}

impl RepoSession {
    pub fn new(
        name: RepoName,
        upstream: UpstreamEndpoint,
        downstream: DownstreamEndpoint,
        mirror_path: impl Into<PathBuf>,
        job_descriptions: HashMap<String, String>,
    ) -> Self {
        RepoSession {
            inner: Arc::new(SessionInner {
                name,
                upstream,
                downstream,
                mirror_path: mirror_path.into(),
                job_descriptions,
            }),
        }
    }

    pub fn name(&self) -> &RepoName {
        &self.inner.name
    }

    pub fn upstream(&self) -> &UpstreamEndpoint {
        &self.inner.upstream
    }

    pub fn downstream(&self) -> &DownstreamEndpoint {
        &self.inner.downstream
    }

    /// Location of the bare mirror working copy.
    pub fn mirror_path(&self) -> &Path {
        &self.inner.mirror_path
    }

    /// Job name to status description overrides.
    pub fn job_descriptions(&self) -> &HashMap<String, String> {
        &self.inner.job_descriptions
    }

    /// Where the mirror fetches from. Cloned anonymously, so the token is
    /// never written into the mirror's git config.
    pub fn upstream_clone_url(&self) -> RemoteUrl {
        RemoteUrl::plain(self.inner.upstream.clone_url.clone())
    }

    /// `https://oauth2:<token>@<host>/<project>`, the mirror push target.
    pub fn downstream_push_url(&self) -> RemoteUrl {
        let downstream = &self.inner.downstream;
        RemoteUrl::with_credentials(
            &format!("https://{}/{}", downstream.host, downstream.project),
            GITLAB_TOKEN_USER,
            &downstream.token,
        )
    }

    /// Web page of a GitLab job, used as a commit status target URL.
    pub fn job_url(&self, job: JobId) -> String {
        let downstream = &self.inner.downstream;
        format!(
            "https://{}/{}/-/jobs/{}",
            downstream.host, downstream.project, job
        )
    }
}
