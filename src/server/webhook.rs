//! Webhook endpoint handlers.
//!
//! Both endpoints authenticate the request against the repository's
//! configured webhook credentials, parse the body, and hand the event to the
//! dispatcher. Processing happens asynchronously in the repository's
//! workers; the response only says whether the event was accepted.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::AppState;
use crate::session::RepoSession;
use crate::webhooks::{Platform, verify_gitlab_token, verify_signature};
use crate::worker::DispatchError;

/// Header name for the GitHub event type.
const HEADER_GITHUB_EVENT: &str = "x-github-event";
/// Header name for the GitHub HMAC signature.
const HEADER_GITHUB_SIGNATURE: &str = "x-hub-signature-256";
/// Header name for the GitLab event type.
const HEADER_GITLAB_EVENT: &str = "x-gitlab-event";
/// Header name for the GitLab shared token.
const HEADER_GITLAB_TOKEN: &str = "x-gitlab-token";

/// Errors that can occur when accepting a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Missing required header.
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    /// Signature or token did not match.
    #[error("invalid webhook credentials")]
    Unauthorized,

    /// Invalid JSON body.
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::MissingHeader(_) | WebhookError::InvalidJson(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::Unauthorized => StatusCode::UNAUTHORIZED,
            WebhookError::Dispatch(DispatchError::UnknownRepository(_)) => StatusCode::NOT_FOUND,
            WebhookError::Dispatch(DispatchError::WorkerStopped { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        (status, self.to_string()).into_response()
    }
}

/// `POST /{repo}/github`
///
/// Requires `X-GitHub-Event`. When the repository has a `webhook_secret`,
/// `X-Hub-Signature-256` must carry a valid HMAC-SHA256 of the body.
///
/// # Response
///
/// - 200 OK: accepted, merged into a pending sync, or ignored
/// - 400 Bad Request: missing header or invalid JSON
/// - 401 Unauthorized: bad signature
/// - 404 Not Found: unknown repository
/// - 503 Service Unavailable: the repository's worker has stopped
pub async fn github_webhook_handler(
    State(app_state): State<AppState>,
    Path(repo): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError> {
    let session = lookup(&app_state, &repo).await?;
    let event = get_header(&headers, HEADER_GITHUB_EVENT)?;

    // Authenticate before parsing anything
    if let Some(secret) = &session.upstream().webhook_secret {
        let signature = get_header(&headers, HEADER_GITHUB_SIGNATURE)?;
        if !verify_signature(&body, &signature, secret.expose().as_bytes()) {
            warn!(repo = %repo, event = %event, "Invalid webhook signature");
            return Err(WebhookError::Unauthorized);
        }
    }

    accept(&app_state, &repo, Platform::GitHub, &event, &body).await
}

/// `POST /{repo}/gitlab`
///
/// Requires `X-Gitlab-Event`. When the repository has a `webhook_token`,
/// `X-Gitlab-Token` must match it. Responses are as for the GitHub endpoint.
pub async fn gitlab_webhook_handler(
    State(app_state): State<AppState>,
    Path(repo): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError> {
    let session = lookup(&app_state, &repo).await?;
    let event = get_header(&headers, HEADER_GITLAB_EVENT)?;

    if let Some(token) = &session.downstream().webhook_token {
        let provided = get_header(&headers, HEADER_GITLAB_TOKEN)?;
        if !verify_gitlab_token(&provided, token.expose()) {
            warn!(repo = %repo, event = %event, "Invalid GitLab webhook token");
            return Err(WebhookError::Unauthorized);
        }
    }

    accept(&app_state, &repo, Platform::GitLab, &event, &body).await
}

async fn lookup(app_state: &AppState, repo: &str) -> Result<RepoSession, WebhookError> {
    app_state
        .dispatcher()
        .session(repo)
        .await
        .ok_or_else(|| DispatchError::UnknownRepository(repo.to_string()).into())
}

async fn accept(
    app_state: &AppState,
    repo: &str,
    platform: Platform,
    event: &str,
    body: &[u8],
) -> Result<(StatusCode, &'static str), WebhookError> {
    let payload: Value = serde_json::from_slice(body)?;

    let outcome = app_state
        .dispatcher()
        .dispatch(repo, platform, event, payload)
        .await?;
    debug!(repo = %repo, %platform, event = %event, ?outcome, "Webhook accepted");

    Ok((StatusCode::OK, "OK"))
}

/// Extracts a required header value as a string.
fn get_header(headers: &HeaderMap, name: &'static str) -> Result<String, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or(WebhookError::MissingHeader(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RepoName;
    use crate::worker::QueueKind;

    #[test]
    fn get_header_present() {
        let mut headers = HeaderMap::new();
        headers.insert("x-gitlab-event", "Pipeline Hook".parse().unwrap());

        let result = get_header(&headers, HEADER_GITLAB_EVENT).unwrap();
        assert_eq!(result, "Pipeline Hook");
    }

    #[test]
    fn get_header_missing() {
        let headers = HeaderMap::new();

        let result = get_header(&headers, HEADER_GITHUB_EVENT);
        assert!(matches!(
            result,
            Err(WebhookError::MissingHeader("x-github-event"))
        ));
    }

    #[test]
    fn error_statuses() {
        let status = |e: WebhookError| e.into_response().status();

        assert_eq!(
            status(WebhookError::MissingHeader(HEADER_GITHUB_EVENT)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(WebhookError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(DispatchError::UnknownRepository("x".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(
                DispatchError::WorkerStopped {
                    repo: RepoName::new("x"),
                    queue: QueueKind::Mirror,
                }
                .into()
            ),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
