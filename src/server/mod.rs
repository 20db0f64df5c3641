//! HTTP gateway for inbound webhooks.
//!
//! # Endpoints
//!
//! - `POST /{repo}/github` - GitHub `push` / `pull_request` deliveries
//! - `POST /{repo}/gitlab` - GitLab `Pipeline Hook` deliveries
//! - `GET /health` - Returns 200 if the server is running

use std::sync::Arc;

use axum::http::StatusCode;

pub mod webhook;

pub use webhook::{WebhookError, github_webhook_handler, gitlab_webhook_handler};

use crate::worker::Dispatcher;

/// Shared application state, passed to handlers via axum's `State`
/// extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        AppState {
            inner: Arc::new(AppStateInner { dispatcher }),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }
}

/// Liveness probe.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/health", get(health_handler))
        .route("/{repo}/github", post(github_webhook_handler))
        .route("/{repo}/gitlab", post(gitlab_webhook_handler))
        .with_state(app_state)
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    use crate::session::tests::{session, signed_session};
    use crate::test_utils::{MockError, MockGit, MockGitHub, MockGitLab, fast_settings, wait_until};
    use crate::webhooks::{compute_signature, format_signature_header};
    use crate::worker::WorkerSettings;

    const GITHUB_SECRET: &[u8] = b"github-hook-secret";
    const GITLAB_TOKEN: &str = "gitlab-hook-token";

    struct Harness {
        app: axum::Router,
        git: MockGit,
        github: MockGitHub,
        _dispatcher: Arc<Dispatcher>,
    }

    /// Registers an open repository `open` and an authenticated one
    /// `signed`, sharing one set of mocks.
    async fn harness() -> Harness {
        let git = MockGit::new();
        let github = MockGitHub::new();
        let gitlab = MockGitLab::new();
        let settings = WorkerSettings {
            backfill_pipelines: 0,
            ..fast_settings()
        };

        let dispatcher = Arc::new(Dispatcher::new(CancellationToken::new()));
        for session in [session("open"), signed_session("signed")] {
            dispatcher
                .spawn_repo(
                    session,
                    git.clone(),
                    github.clone(),
                    gitlab.clone(),
                    settings,
                )
                .await;
        }

        Harness {
            app: build_router(AppState::new(dispatcher.clone())),
            git,
            github,
            _dispatcher: dispatcher,
        }
    }

    fn post(uri: &str, headers: &[(&str, &str)], body: &[u8]) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::from(body.to_vec())).unwrap()
    }

    fn signed_github(uri: &str, event: &str, body: &[u8]) -> Request<Body> {
        let signature = format_signature_header(&compute_signature(body, GITHUB_SECRET));
        post(
            uri,
            &[
                ("x-github-event", event),
                ("x-hub-signature-256", signature.as_str()),
            ],
            body,
        )
    }

    fn pipeline_body() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "object_kind": "pipeline",
            "object_attributes": { "id": 31 },
            "commit": { "id": "a".repeat(40) },
            "builds": [{ "id": 7, "name": "unit-tests", "status": "success" }]
        }))
        .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_returns_200() {
        let h = harness().await;
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    #[tokio::test]
    async fn github_push_triggers_sync() {
        let h = harness().await;
        wait_until("bootstrap", || h.git.count("push_mirror") == 2).await;

        let request = post(
            "/open/github",
            &[("x-github-event", "push")],
            br#"{"ref":"refs/heads/main"}"#,
        );
        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
        wait_until("sync", || h.git.count("push_mirror") == 3).await;
    }

    #[tokio::test]
    async fn signed_github_delivery_is_accepted() {
        let h = harness().await;
        let body = br#"{"action":"opened"}"#;

        let response = h
            .app
            .oneshot(signed_github("/signed/github", "pull_request", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn bad_signature_returns_401() {
        let h = harness().await;
        let body = br#"{"ref":"refs/heads/main"}"#;
        let wrong = format_signature_header(&compute_signature(body, b"wrong-secret"));

        let request = post(
            "/signed/github",
            &[("x-github-event", "push"), ("x-hub-signature-256", wrong.as_str())],
            body,
        );
        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_signature_on_signed_repo_returns_400() {
        let h = harness().await;
        let request = post("/signed/github", &[("x-github-event", "push")], b"{}");

        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_event_header_returns_400() {
        let h = harness().await;
        let request = post("/open/github", &[], b"{}");

        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("x-github-event"));
    }

    #[tokio::test]
    async fn invalid_json_returns_400() {
        let h = harness().await;
        let request = post("/open/github", &[("x-github-event", "push")], b"not json");

        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_repository_returns_404() {
        let h = harness().await;
        let request = post("/nope/github", &[("x-github-event", "push")], b"{}");

        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ignored_event_still_returns_200() {
        let h = harness().await;
        let request = post("/open/github", &[("x-github-event", "ping")], b"{}");

        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn gitlab_pipeline_hook_posts_status() {
        let h = harness().await;
        let request = post(
            "/signed/gitlab",
            &[
                ("x-gitlab-event", "Pipeline Hook"),
                ("x-gitlab-token", GITLAB_TOKEN),
            ],
            &pipeline_body(),
        );

        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        wait_until("status post", || h.github.posted_count() == 1).await;
        let update = &h.github.posted()[0];
        assert_eq!(update.context, "gitlab/unit-tests");
        assert_eq!(
            update.target_url,
            "https://gitlab.example.com/mirrors/signed/-/jobs/7"
        );
    }

    #[tokio::test]
    async fn wrong_gitlab_token_returns_401() {
        let h = harness().await;
        let request = post(
            "/signed/gitlab",
            &[
                ("x-gitlab-event", "Pipeline Hook"),
                ("x-gitlab-token", "guess"),
            ],
            &pipeline_body(),
        );

        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(h.github.attempts(), 0);
    }

    #[tokio::test]
    async fn stopped_worker_returns_503() {
        let git = MockGit::new();
        git.behaviour()
            .fail_always("clone_mirror", MockError::permanent("repository not found"));
        let dispatcher = Arc::new(Dispatcher::new(CancellationToken::new()));
        dispatcher
            .spawn_repo(
                session("broken"),
                git.clone(),
                MockGitHub::new(),
                MockGitLab::new(),
                fast_settings(),
            )
            .await;
        let app = build_router(AppState::new(dispatcher.clone()));

        let status = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                let request = post("/broken/github", &[("x-github-event", "push")], b"{}");
                let response = app.clone().oneshot(request).await.unwrap();
                if response.status() != StatusCode::OK {
                    return response.status();
                }
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
