//! GitHub API error types.
//!
//! Errors are split into two kinds for the retry logic in [`crate::retry`]:
//!
//! - **Transient** errors are retriable (5xx, rate limits, network failures)
//! - **Permanent** errors will fail the same way again (most 4xx: bad token,
//!   unknown repository, unknown commit)

use std::fmt;
use thiserror::Error;

use crate::retry::Retriable;

/// The kind of GitHub API error, categorized for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// Transient error - safe to retry with backoff.
    ///
    /// Examples:
    /// - HTTP 5xx (server errors)
    /// - HTTP 429 (rate limited)
    /// - HTTP 403 with rate limit wording
    /// - Network timeouts
    Transient,

    /// Permanent error - retrying will not help.
    ///
    /// Examples:
    /// - HTTP 401/403 (bad or under-scoped token)
    /// - HTTP 404 (repository not visible to the token)
    /// - HTTP 422 (commit SHA unknown to GitHub, e.g. not yet pushed upstream)
    Permanent,
}

impl GitHubErrorKind {
    /// Returns true if this error is retriable.
    pub fn is_retriable(&self) -> bool {
        matches!(self, GitHubErrorKind::Transient)
    }
}

/// A GitHub API error with categorization for retry decisions.
#[derive(Debug, Error)]
pub struct GitHubApiError {
    /// The kind of error (transient or permanent).
    pub kind: GitHubErrorKind,

    /// The HTTP status code, if available.
    pub status_code: Option<u16>,

    /// A human-readable description of the error.
    pub message: String,

    /// The underlying octocrab error, if available.
    #[source]
    pub source: Option<octocrab::Error>,
}

impl fmt::Display for GitHubApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "GitHub API error (HTTP {}): {}", code, self.message),
            None => write!(f, "GitHub API error: {}", self.message),
        }
    }
}

impl Retriable for GitHubApiError {
    fn is_retriable(&self) -> bool {
        self.kind.is_retriable()
    }
}

impl GitHubApiError {
    /// Categorizes an octocrab error.
    ///
    /// API responses carry their status in `Error::GitHub`. Other variants
    /// (transport, decoding) only have their message to go on.
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let (status_code, message) = match &err {
            octocrab::Error::GitHub { source, .. } => {
                (Some(source.status_code.as_u16()), source.message.clone())
            }
            other => {
                let message = other.to_string();
                (extract_status_code(&message), message)
            }
        };
        let kind = classify(status_code, &message);

        Self {
            kind,
            status_code,
            message,
            source: Some(err),
        }
    }
}

/// Decides transient vs permanent from the status code and message.
fn classify(status_code: Option<u16>, message: &str) -> GitHubErrorKind {
    match status_code {
        Some(429) => GitHubErrorKind::Transient,
        Some(403) if is_rate_limit_error(message) => GitHubErrorKind::Transient,
        Some(code) if (500..600).contains(&code) => GitHubErrorKind::Transient,
        Some(_) => GitHubErrorKind::Permanent,
        None if is_network_error(message) || is_rate_limit_error(message) => {
            GitHubErrorKind::Transient
        }
        None => GitHubErrorKind::Permanent,
    }
}

/// Extracts the HTTP status code from an octocrab error message, if present.
///
/// Only used for variants without a structured status. Falling back to
/// `None` leaves classification to the message heuristics.
fn extract_status_code(err_str: &str) -> Option<u16> {
    if let Some(idx) = err_str.find("status: ") {
        let digits: String = err_str[idx + 8..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Ok(code) = digits.parse() {
            return Some(code);
        }
    }

    const KNOWN: [u16; 10] = [401, 403, 404, 409, 422, 429, 500, 502, 503, 504];
    KNOWN
        .into_iter()
        .find(|code| err_str.contains(&code.to_string()))
}

/// Checks if an error message indicates a rate limit.
fn is_rate_limit_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("rate limit")
        || message_lower.contains("api rate")
        || message_lower.contains("secondary rate")
        || message_lower.contains("abuse detection")
}

/// Checks if an error message indicates a network-level error.
fn is_network_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("timeout")
        || message_lower.contains("connection")
        || message_lower.contains("network")
        || message_lower.contains("dns")
        || message_lower.contains("timed out")
}
