//! Local git operations on a repository's mirror working copy.
//!
//! The mirror is a bare `--mirror` clone of the upstream repository. Every
//! operation here is a `git` subprocess run through `tokio::process`, so each
//! one is an await point for the owning worker.
//!
//! Remote URLs may embed access tokens. They are passed to git as arguments
//! but never logged or returned in errors: command lines and stderr are
//! scrubbed through [`RemoteUrl::scrub`] first.

use std::path::{Path, PathBuf};
use std::process::Output;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::effects::{GitEffect, GitInterpreter, GitResponse, RefEntry};
use crate::retry::Retriable;
use crate::types::RemoteUrl;

/// Errors from git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Git command failed.
    #[error("git command failed: {command}\nstderr: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// `git show-ref` printed a line we could not parse.
    #[error("unexpected show-ref output: {line:?}")]
    MalformedRef { line: String },

    /// The mirror path does not name a directory to clone into.
    #[error("invalid mirror path: {}", path.display())]
    InvalidMirrorPath { path: PathBuf },

    /// IO error (including a missing `git` binary).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Retriable for GitError {
    /// Command failures are mostly network trouble talking to a remote, so
    /// they are worth another attempt. The rest will not fix themselves.
    fn is_retriable(&self) -> bool {
        matches!(self, GitError::CommandFailed { .. })
    }
}

/// Result type for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Create a git Command with clean environment (no system/user config).
///
/// This ensures consistent behavior across different machines by ignoring
/// system and user git configuration (e.g., credential helpers, hooks, aliases).
pub(crate) fn git_command(workdir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(workdir);

    // Disable system and user config for reproducible behavior
    cmd.env("GIT_CONFIG_NOSYSTEM", "1");
    cmd.env("GIT_CONFIG_GLOBAL", "/dev/null");

    // Disable terminal prompts
    cmd.env("GIT_TERMINAL_PROMPT", "0");

    cmd.kill_on_drop(true);
    cmd
}

/// Run a git command in the given working directory.
///
/// `remote` is the credential-bearing URL among `args`, if any; it is
/// scrubbed from the error's command line and stderr.
pub async fn run_git(
    workdir: &Path,
    args: &[&str],
    remote: Option<&RemoteUrl>,
) -> GitResult<Output> {
    trace!(workdir = %workdir.display(), command = %redacted_command(args, remote), "git");
    let output = git_command(workdir).args(args).output().await?;

    if output.status.success() {
        Ok(output)
    } else {
        Err(command_failed(args, remote, &output))
    }
}

fn redacted_command(args: &[&str], remote: Option<&RemoteUrl>) -> String {
    let command = format!("git {}", args.join(" "));
    match remote {
        Some(url) => url.scrub(&command),
        None => command,
    }
}

fn command_failed(args: &[&str], remote: Option<&RemoteUrl>, output: &Output) -> GitError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = match remote {
        Some(url) => url.scrub(&stderr),
        None => stderr.into_owned(),
    };
    GitError::CommandFailed {
        command: redacted_command(args, remote),
        stderr,
    }
}

/// Parses `git show-ref` output (`<sha> <refname>` per line).
pub fn parse_show_ref(stdout: &str) -> GitResult<Vec<RefEntry>> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| match line.split_once(' ') {
            Some((sha, name)) if !sha.is_empty() && !name.is_empty() => Ok(RefEntry {
                name: name.to_string(),
                sha: sha.to_string(),
            }),
            _ => Err(GitError::MalformedRef {
                line: line.to_string(),
            }),
        })
        .collect()
}

// ─── Interpreter ─────────────────────────────────────────────────────────────

/// Executes [`GitEffect`]s against one mirror working copy.
#[derive(Debug, Clone)]
pub struct LocalGit {
    path: PathBuf,
}

impl LocalGit {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LocalGit { path: path.into() }
    }

    /// True when the mirror path is itself the git directory of a repository.
    ///
    /// A plain directory nested inside some unrelated checkout would satisfy
    /// `git rev-parse`, so the resolved git dir is compared with the path.
    async fn is_repository(&self) -> GitResult<bool> {
        if !tokio::fs::metadata(&self.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Ok(false);
        }

        let output = git_command(&self.path)
            .args(["rev-parse", "--absolute-git-dir"])
            .output()
            .await?;
        if !output.status.success() {
            return Ok(false);
        }

        let git_dir = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        let ours = tokio::fs::canonicalize(&self.path).await?;
        let theirs = tokio::fs::canonicalize(&git_dir).await?;
        Ok(ours == theirs)
    }

    async fn clone_mirror(&self, url: &RemoteUrl) -> GitResult<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let Some(target) = self.path.file_name() else {
            return Err(GitError::InvalidMirrorPath {
                path: self.path.clone(),
            });
        };
        tokio::fs::create_dir_all(&parent).await?;

        let target = target.to_string_lossy();
        run_git(
            &parent,
            &["clone", "--bare", "--mirror", url.expose(), &target],
            Some(url),
        )
        .await?;
        Ok(())
    }

    async fn show_ref(&self) -> GitResult<Vec<RefEntry>> {
        let output = git_command(&self.path).arg("show-ref").output().await?;

        // show-ref exits 1 when the repository has no refs at all
        if output.status.code() == Some(1) && output.stdout.is_empty() {
            return Ok(Vec::new());
        }
        if !output.status.success() {
            return Err(command_failed(&["show-ref"], None, &output));
        }

        parse_show_ref(&String::from_utf8_lossy(&output.stdout))
    }
}

impl GitInterpreter for LocalGit {
    type Error = GitError;

    async fn interpret(&self, effect: GitEffect) -> Result<GitResponse, Self::Error> {
        debug!(path = %self.path.display(), op = effect.name(), "git effect");

        match effect {
            GitEffect::IsRepository => self.is_repository().await.map(GitResponse::Bool),

            GitEffect::CloneMirror { url } => {
                self.clone_mirror(&url).await?;
                Ok(GitResponse::Ok)
            }

            GitEffect::SetOriginUrl { url } => {
                run_git(
                    &self.path,
                    &["remote", "set-url", "origin", url.expose()],
                    Some(&url),
                )
                .await?;
                Ok(GitResponse::Ok)
            }

            GitEffect::ReplaceConfig { key, value } => {
                run_git(&self.path, &["config", "--replace-all", &key, &value], None).await?;
                Ok(GitResponse::Ok)
            }

            GitEffect::AddConfig { key, value } => {
                run_git(&self.path, &["config", "--add", &key, &value], None).await?;
                Ok(GitResponse::Ok)
            }

            GitEffect::RemoteUpdate { prune } => {
                let mut args = vec!["remote", "update"];
                if prune {
                    args.push("-p");
                }
                run_git(&self.path, &args, None).await?;
                Ok(GitResponse::Ok)
            }

            GitEffect::ShowRef => self.show_ref().await.map(GitResponse::Refs),

            GitEffect::PushMirror { url } => {
                run_git(&self.path, &["push", "--mirror", url.expose()], Some(&url)).await?;
                Ok(GitResponse::Ok)
            }
        }
    }
}
