//! YAML configuration file.
//!
//! ```yaml
//! listen: "0.0.0.0:3000"
//! repos:
//!   widgets:
//!     path: /var/lib/mirror-relay/widgets.git
//!     github:
//!       repo: octo/widgets
//!       access_token: ghp_...
//!     gitlab:
//!       host: gitlab.example.com
//!       repo: mirrors/widgets
//!       access_token: glpat-...
//!       job_descriptions:
//!         unit-tests: Unit Tests
//! ```
//!
//! The file is read once at startup. Anything invalid is reported before any
//! worker starts.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use crate::retry::RetryConfig;
use crate::session::{DownstreamEndpoint, RepoSession, UpstreamEndpoint};
use crate::types::{RepoId, RepoName, Secret};
use crate::worker::WorkerSettings;

/// Environment variable overriding `listen`.
pub const LISTEN_ENV: &str = "MIRROR_RELAY_LISTEN";

const DEFAULT_LISTEN: ([u8; 4], u16) = ([0, 0, 0, 0], 3000);
const DEFAULT_STATUS_QUEUE_CAPACITY: usize = 256;
const DEFAULT_BACKFILL_PIPELINES: u32 = 5;

/// GitLab caps `per_page` at 100.
const MAX_BACKFILL_PIPELINES: u32 = 100;

/// Errors from loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no repositories configured")]
    NoRepositories,

    #[error("repository {repo:?}: {message}")]
    InvalidRepo { repo: String, message: String },

    #[error("invalid setting {field}: {message}")]
    InvalidSetting { field: &'static str, message: String },
}

impl ConfigError {
    fn repo(repo: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidRepo {
            repo: repo.to_string(),
            message: message.into(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(DEFAULT_LISTEN)
}

fn default_status_queue_capacity() -> usize {
    DEFAULT_STATUS_QUEUE_CAPACITY
}

fn default_backfill_pipelines() -> u32 {
    DEFAULT_BACKFILL_PIPELINES
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Address the webhook gateway binds to.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Capacity of each repository's status event queue.
    #[serde(default = "default_status_queue_capacity")]
    pub status_queue_capacity: usize,

    /// How many recent pipelines to replay on startup. Zero disables backfill.
    #[serde(default = "default_backfill_pipelines")]
    pub backfill_pipelines: u32,

    /// Repository pairings, keyed by the name used in webhook routes.
    pub repos: BTreeMap<String, RepoConfig>,
}

/// One repository pairing.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoConfig {
    /// Local mirror location.
    pub path: PathBuf,
    pub github: GitHubConfig,
    pub gitlab: GitLabConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitHubConfig {
    /// `owner/name`.
    pub repo: String,
    pub access_token: Secret,
    #[serde(default)]
    pub webhook_secret: Option<Secret>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub clone_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitLabConfig {
    pub host: String,
    /// Project path, `group/project`.
    pub repo: String,
    pub access_token: Secret,
    #[serde(default)]
    pub webhook_token: Option<Secret>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub job_descriptions: HashMap<String, String>,
}

impl RelayConfig {
    /// Reads, parses and validates the configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    /// Parses and validates configuration text. `origin` is only used in
    /// error messages.
    pub fn parse(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: RelayConfig =
            serde_yaml::from_str(contents).map_err(|source| ConfigError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides (`MIRROR_RELAY_LISTEN`).
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_listen_override(std::env::var(LISTEN_ENV).ok().as_deref())
    }

    /// Overrides the listen address when `listen` is given.
    pub fn with_listen_override(mut self, listen: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(raw) = listen {
            self.listen = raw
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::InvalidSetting {
                    field: LISTEN_ENV,
                    message: format!("{raw:?}: {e}"),
                })?;
        }
        Ok(self)
    }

    /// Checks everything serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repos.is_empty() {
            return Err(ConfigError::NoRepositories);
        }
        if self.status_queue_capacity == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "status_queue_capacity",
                message: "must be at least 1".to_string(),
            });
        }
        if self.backfill_pipelines > MAX_BACKFILL_PIPELINES {
            return Err(ConfigError::InvalidSetting {
                field: "backfill_pipelines",
                message: format!("must be at most {MAX_BACKFILL_PIPELINES}"),
            });
        }

        for (name, repo) in &self.repos {
            repo.validate(name)?;
        }
        Ok(())
    }

    /// Builds one session per configured repository.
    pub fn sessions(&self) -> Result<Vec<RepoSession>, ConfigError> {
        self.repos
            .iter()
            .map(|(name, repo)| repo.session(name))
            .collect()
    }

    /// Queue and backfill settings shared by every repository's workers.
    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            status_queue_capacity: self.status_queue_capacity,
            backfill_pipelines: self.backfill_pipelines,
            item_retry: RetryConfig::DEFAULT,
            bootstrap_retry: RetryConfig::RECOVERY,
        }
    }
}

impl RepoConfig {
    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if name.is_empty() || name.contains('/') {
            return Err(ConfigError::repo(
                name,
                "name must be non-empty and must not contain '/'",
            ));
        }
        if self.path.as_os_str().is_empty() || self.path.file_name().is_none() {
            return Err(ConfigError::repo(name, "path must name a directory"));
        }

        RepoId::parse(&self.github.repo).map_err(|e| ConfigError::repo(name, e.to_string()))?;
        if self.github.access_token.is_empty() {
            return Err(ConfigError::repo(name, "github.access_token is empty"));
        }
        if let Some(url) = &self.github.api_url {
            Url::parse(url)
                .map_err(|e| ConfigError::repo(name, format!("github.api_url: {e}")))?;
        }

        if self.gitlab.host.is_empty() || self.gitlab.host.contains('/') {
            return Err(ConfigError::repo(
                name,
                "gitlab.host must be a bare host name",
            ));
        }
        if self.gitlab.repo.is_empty() {
            return Err(ConfigError::repo(name, "gitlab.repo is empty"));
        }
        if self.gitlab.access_token.is_empty() {
            return Err(ConfigError::repo(name, "gitlab.access_token is empty"));
        }
        self.gitlab_api_url(name)?;
        Ok(())
    }

    fn gitlab_api_url(&self, name: &str) -> Result<Url, ConfigError> {
        let raw = self
            .gitlab
            .api_url
            .clone()
            .unwrap_or_else(|| format!("https://{}/api/v4/", self.gitlab.host));
        let url =
            Url::parse(&raw).map_err(|e| ConfigError::repo(name, format!("gitlab.api_url: {e}")))?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::repo(name, "gitlab.api_url is not a base URL"));
        }
        Ok(url)
    }

    fn session(&self, name: &str) -> Result<RepoSession, ConfigError> {
        let repo_id =
            RepoId::parse(&self.github.repo).map_err(|e| ConfigError::repo(name, e.to_string()))?;
        let clone_url = self
            .github
            .clone_url
            .clone()
            .unwrap_or_else(|| format!("https://github.com/{}", repo_id));

        Ok(RepoSession::new(
            RepoName::new(name),
            UpstreamEndpoint {
                repo: repo_id,
                token: self.github.access_token.clone(),
                api_url: self.github.api_url.clone(),
                clone_url,
                webhook_secret: self.github.webhook_secret.clone(),
            },
            DownstreamEndpoint {
                host: self.gitlab.host.clone(),
                project: self.gitlab.repo.clone(),
                token: self.gitlab.access_token.clone(),
                api_url: self.gitlab_api_url(name)?,
                webhook_token: self.gitlab.webhook_token.clone(),
            },
            self.path.clone(),
            self.gitlab.job_descriptions.clone(),
        ))
    }
}
