//! Reqwest-based GitLab REST client scoped to one project.

use std::time::Duration;

use reqwest::Url;
use serde::de::DeserializeOwned;

use crate::types::Secret;

use super::error::GitLabApiError;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Header GitLab reads personal/project access tokens from.
const PRIVATE_TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// Builds the process-wide HTTP client shared by every project.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .user_agent(concat!("mirror-relay/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// A GitLab API client scoped to one project.
///
/// Cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct GitLabClient {
    http: reqwest::Client,
    /// API root, e.g. `https://gitlab.example.com/api/v4/`.
    api_base: Url,
    /// Project path, e.g. `group/project`.
    project: String,
    token: Secret,
}

impl GitLabClient {
    pub fn new(
        http: reqwest::Client,
        api_base: Url,
        project: impl Into<String>,
        token: Secret,
    ) -> Self {
        Self {
            http,
            api_base,
            project: project.into(),
            token,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// `<api_base>/projects/<url-encoded project>/<segments...>`.
    ///
    /// The project path is pushed as a single segment, so its `/` is encoded
    /// as `%2F` the way the GitLab API expects.
    pub fn project_url(&self, segments: &[&str]) -> Result<Url, GitLabApiError> {
        let mut url = self.api_base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                GitLabApiError::invalid_url(format!("not a base URL: {}", self.api_base))
            })?;
            path.pop_if_empty().push("projects").push(&self.project);
            path.extend(segments);
        }
        Ok(url)
    }

    /// GET `url` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, GitLabApiError> {
        let response = self
            .http
            .get(url)
            .header(PRIVATE_TOKEN_HEADER, self.token.expose())
            .send()
            .await
            .map_err(GitLabApiError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|value| {
                    value
                        .get("message")
                        .or_else(|| value.get("error"))
                        .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                })
                .unwrap_or(body);
            return Err(GitLabApiError::from_status(status, message));
        }

        response.json::<T>().await.map_err(GitLabApiError::from_reqwest)
    }
}

impl std::fmt::Debug for GitLabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabClient")
            .field("api_base", &self.api_base.as_str())
            .field("project", &self.project)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> GitLabClient {
        GitLabClient::new(
            reqwest::Client::new(),
            Url::parse(base).unwrap(),
            "group/sub/project",
            Secret::new("glpat-test"),
        )
    }

    #[test]
    fn project_path_is_a_single_encoded_segment() {
        let url = client("https://gitlab.example.com/api/v4/")
            .project_url(&["pipelines"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://gitlab.example.com/api/v4/projects/group%2Fsub%2Fproject/pipelines"
        );
    }

    #[test]
    fn base_without_trailing_slash() {
        let url = client("https://gitlab.example.com/api/v4")
            .project_url(&["pipelines", "7", "jobs"])
            .unwrap();
        assert_eq!(
            url.path(),
            "/api/v4/projects/group%2Fsub%2Fproject/pipelines/7/jobs"
        );
    }

    #[test]
    fn debug_hides_token() {
        let rendered = format!("{:?}", client("https://gitlab.example.com/api/v4/"));
        assert!(!rendered.contains("glpat-test"));
    }
}
