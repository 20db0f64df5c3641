//! Credential wrappers that never print their contents.
//!
//! Access tokens travel through `Debug`-derived structs (sessions, effects,
//! errors) and through git remote URLs. Both types here render redacted so a
//! stray `{:?}` or a `tracing` field cannot leak a token into the logs.

use std::fmt;

use serde::Deserialize;

const REDACTED: &str = "***";

/// A secret string (access token, webhook secret).
///
/// Deserializes from a plain string so configuration structs can hold tokens
/// directly without exposing them in their `Debug` output.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(s: impl Into<String>) -> Self {
        Secret(s.into())
    }

    /// Returns the secret value. Callers must not log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

/// A git remote URL that may embed credentials in its userinfo
/// (`https://oauth2:<token>@host/path`).
///
/// `Display` and `Debug` show the URL with the password replaced, so remote
/// URLs can be logged freely. [`RemoteUrl::expose`] returns the real URL for
/// passing to git.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteUrl {
    url: String,
    secret: Option<Secret>,
}

impl RemoteUrl {
    /// A URL without embedded credentials (or a local path).
    pub fn plain(url: impl Into<String>) -> Self {
        RemoteUrl {
            url: url.into(),
            secret: None,
        }
    }

    /// Builds `<scheme>://<user>:<password>@<rest>` from a base URL.
    ///
    /// `base` must contain `://`; otherwise the URL is returned unchanged.
    pub fn with_credentials(base: &str, user: &str, password: &Secret) -> Self {
        match base.split_once("://") {
            Some((scheme, rest)) => RemoteUrl {
                url: format!("{}://{}:{}@{}", scheme, user, password.expose(), rest),
                secret: Some(password.clone()),
            },
            None => RemoteUrl::plain(base),
        }
    }

    /// Returns the URL including credentials. Callers must not log the result.
    pub fn expose(&self) -> &str {
        &self.url
    }

    /// Returns the embedded secret, if any.
    pub fn secret(&self) -> Option<&Secret> {
        self.secret.as_ref()
    }

    /// Replaces every occurrence of the embedded secret in `text`.
    ///
    /// Used to scrub git's stderr, which may echo the remote URL.
    pub fn scrub(&self, text: &str) -> String {
        match &self.secret {
            Some(secret) if !secret.is_empty() => text.replace(secret.expose(), REDACTED),
            _ => text.to_string(),
        }
    }
}

impl fmt::Display for RemoteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.scrub(&self.url))
    }
}

impl fmt::Debug for RemoteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RemoteUrl({})", self)
    }
}
