//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different ID types (e.g., passing a
//! GitLab job ID where a pipeline ID is expected) and make signatures
//! self-documenting.

use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Borrow;
use std::fmt;
use thiserror::Error;

/// The name a repository pairing is configured under.
///
/// This is the key of the `repos` map in the configuration file and the first
/// path segment of the webhook routes (`POST /{repo}/github`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoName(pub String);

impl RepoName {
    pub fn new(s: impl Into<String>) -> Self {
        RepoName(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RepoName {
    fn from(s: &str) -> Self {
        RepoName(s.to_string())
    }
}

// Lets maps keyed by `RepoName` be queried with the raw route segment.
impl Borrow<str> for RepoName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Error returned when a git object ID is not 40 hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid SHA: {0:?}")]
pub struct InvalidSha(pub String);

/// A git commit SHA (40 hex characters).
///
/// Deserializing goes through [`Sha::parse`]: SHAs arrive in webhook
/// payloads and end up in API paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sha(pub String);

impl<'de> Deserialize<'de> for Sha {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Sha::parse(s).map_err(serde::de::Error::custom)
    }
}

impl Sha {
    /// Creates a new Sha from a string.
    ///
    /// Note: This does not validate the format. Use [`Sha::parse`] for input
    /// read from git.
    pub fn new(s: impl Into<String>) -> Self {
        Sha(s.into())
    }

    /// Parses a full 40-character hex SHA.
    pub fn parse(s: impl Into<String>) -> Result<Self, InvalidSha> {
        let s = s.into();
        if s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Sha(s.to_ascii_lowercase()))
        } else {
            Err(InvalidSha(s))
        }
    }

    /// Returns the SHA as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a short (7-character) version of the SHA for display.
    pub fn short(&self) -> &str {
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl fmt::Display for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Sha {
    fn from(s: &str) -> Self {
        Sha(s.to_string())
    }
}

/// Error returned when a GitHub repository is not of the form `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid GitHub repository {0:?}: expected owner/name")]
pub struct InvalidRepoId(pub String);

/// A GitHub repository identifier (owner/repo format).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        RepoId {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Parses an `owner/name` string.
    pub fn parse(s: &str) -> Result<Self, InvalidRepoId> {
        match s.split_once('/') {
            Some((owner, repo))
                if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
            {
                Ok(RepoId::new(owner, repo))
            }
            _ => Err(InvalidRepoId(s.to_string())),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A GitLab pipeline ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineId(pub u64);

impl fmt::Display for PipelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A GitLab job ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod sha {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_accepts_hex(s in "[0-9a-fA-F]{40}") {
                let sha = Sha::parse(s.clone()).unwrap();
                prop_assert_eq!(sha.as_str(), s.to_ascii_lowercase());
            }

            #[test]
            fn parse_rejects_wrong_length(s in "[0-9a-f]{0,39}") {
                prop_assert!(Sha::parse(s).is_err());
            }

            #[test]
            fn short_returns_7_chars(s in "[0-9a-f]{40}") {
                let sha = Sha::new(&s);
                prop_assert_eq!(sha.short(), &s[..7]);
            }
        }

        proptest! {
            #[test]
            fn deserialize_accepts_full_shas(sha in crate::test_utils::arb_sha()) {
                let value = serde_json::json!(sha.as_str());
                let parsed: Sha = serde_json::from_value(value).unwrap();
                prop_assert_eq!(parsed, sha);
            }
        }

        #[test]
        fn deserialize_rejects_paths_and_short_shas() {
            let slash = format!("{}/x", "a".repeat(38));
            for bad in ["../../../../user/repos", "abc", "", slash.as_str()] {
                let result: Result<Sha, _> = serde_json::from_value(serde_json::json!(bad));
                assert!(result.is_err(), "{bad:?} should be rejected");
            }
        }

        #[test]
        fn parse_rejects_non_hex() {
            let input = format!("{}z", "a".repeat(39));
            assert_eq!(Sha::parse(input.clone()), Err(InvalidSha(input)));
        }

        #[test]
        fn short_handles_short_input() {
            let sha = Sha::new("abc");
            assert_eq!(sha.short(), "abc");
        }
    }

    mod repo_id {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_display_agree(
                owner in "[a-zA-Z][a-zA-Z0-9-]{0,38}",
                repo in "[a-zA-Z][a-zA-Z0-9_.-]{0,99}"
            ) {
                let id = RepoId::parse(&format!("{}/{}", owner, repo)).unwrap();
                prop_assert_eq!(&id.owner, &owner);
                prop_assert_eq!(format!("{}", id), format!("{}/{}", owner, repo));
            }
        }

        #[test]
        fn parse_rejects_malformed() {
            for bad in ["", "owner", "owner/", "/repo", "a/b/c"] {
                assert!(RepoId::parse(bad).is_err(), "{bad:?} should be rejected");
            }
        }
    }
}
