//! Git operation effect types.
//!
//! These types describe operations on a repository's local mirror as data.
//! Effects are working-copy-scoped: the interpreter is constructed with the
//! mirror path, so effects don't include it.

use crate::types::{RemoteUrl, Sha};

/// Refspec that keeps every upstream ref, not just branches and tags.
pub const MIRROR_ALL_REFSPEC: &str = "+refs/*:refs/*";

/// Refspec that exposes pull request heads as ordinary branches, so the
/// downstream host lists them (and runs pipelines for them) like any branch.
pub const PULL_AS_BRANCH_REFSPEC: &str = "+refs/pull/*:refs/heads/pull/*";

/// Config key holding the fetch refspecs of `origin`.
pub const ORIGIN_FETCH_KEY: &str = "remote.origin.fetch";

/// A git operation effect.
///
/// Remote URLs are carried as [`RemoteUrl`] so credentials stay redacted in
/// `Debug` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitEffect {
    /// Check whether the working copy already exists as a git repository.
    IsRepository,

    /// Create the working copy as a bare mirror clone of `url`.
    CloneMirror { url: RemoteUrl },

    /// Point `origin` at `url`.
    SetOriginUrl { url: RemoteUrl },

    /// Replace all values of a config key with a single value.
    ReplaceConfig { key: String, value: String },

    /// Add a value to a multi-valued config key.
    AddConfig { key: String, value: String },

    /// Fetch all remotes (`git remote update`), optionally pruning deleted refs.
    RemoteUpdate { prune: bool },

    /// List all refs in the working copy.
    ShowRef,

    /// Push the full ref set to `url` (`git push --mirror`).
    PushMirror { url: RemoteUrl },
}

impl GitEffect {
    /// Short operation name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            GitEffect::IsRepository => "is_repository",
            GitEffect::CloneMirror { .. } => "clone_mirror",
            GitEffect::SetOriginUrl { .. } => "set_origin_url",
            GitEffect::ReplaceConfig { .. } => "replace_config",
            GitEffect::AddConfig { .. } => "add_config",
            GitEffect::RemoteUpdate { .. } => "remote_update",
            GitEffect::ShowRef => "show_ref",
            GitEffect::PushMirror { .. } => "push_mirror",
        }
    }
}

/// One line of `git show-ref`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefEntry {
    pub name: String,
    pub sha: String,
}

impl RefEntry {
    pub fn new(name: impl Into<String>, sha: &Sha) -> Self {
        RefEntry {
            name: name.into(),
            sha: sha.as_str().to_string(),
        }
    }
}

/// Response from a git effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitResponse {
    /// Operation completed successfully with no specific return value.
    Ok,
    /// Operation returned a boolean (e.g., from IsRepository).
    Bool(bool),
    /// Operation returned a ref listing (from ShowRef).
    Refs(Vec<RefEntry>),
}
