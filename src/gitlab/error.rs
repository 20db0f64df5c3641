//! GitLab API error types.
//!
//! Same transient/permanent split as [`crate::github::GitHubApiError`], derived
//! from `reqwest` errors and response status codes instead of octocrab's.

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

use crate::retry::Retriable;

/// The kind of GitLab API error, categorized for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitLabErrorKind {
    /// 5xx, 429, connection failures and timeouts.
    Transient,
    /// Everything else, including bodies that do not decode.
    Permanent,
}

/// A GitLab API error with categorization for retry decisions.
#[derive(Debug, Error)]
pub struct GitLabApiError {
    pub kind: GitLabErrorKind,
    pub status_code: Option<u16>,
    pub message: String,
    #[source]
    pub source: Option<reqwest::Error>,
}

impl fmt::Display for GitLabApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "GitLab API error (HTTP {}): {}", code, self.message),
            None => write!(f, "GitLab API error: {}", self.message),
        }
    }
}

impl Retriable for GitLabApiError {
    fn is_retriable(&self) -> bool {
        self.kind == GitLabErrorKind::Transient
    }
}

impl GitLabApiError {
    /// An error response from GitLab.
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let kind = if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            GitLabErrorKind::Transient
        } else {
            GitLabErrorKind::Permanent
        };
        Self {
            kind,
            status_code: Some(status.as_u16()),
            message: message.into(),
            source: None,
        }
    }

    /// A failure to send the request or read the response.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() || err.is_connect() || err.is_request() {
            GitLabErrorKind::Transient
        } else {
            GitLabErrorKind::Permanent
        };
        Self {
            kind,
            status_code: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// A URL that could not be built from the configured API base.
    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self {
            kind: GitLabErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }
}
