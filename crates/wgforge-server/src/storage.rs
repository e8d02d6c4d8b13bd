//! Config storage
//!
//! Publishes rendered configs and returns a URL the caller can download
//! them from. Two backends: commits through the GitHub contents API, or
//! plain files in a local directory that this server also serves.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::settings::{GitHubSettings, LocalSettings, StoreSettings};

/// A stored config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredConfig {
    /// Public download URL
    pub url: String,
}

/// Persistence collaborator
///
/// Implementations do not retry; a failed call is reported once.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Store `content` under `filename`
    async fn store(&self, filename: &str, content: &str) -> Result<StoredConfig, StoreError>;
}

/// Build the backend selected in the settings
pub async fn build_store(settings: &StoreSettings) -> Result<Arc<dyn ConfigStore>, StoreError> {
    match settings {
        StoreSettings::GitHub(github) => {
            if github.token.is_none() {
                warn!("No GitHub token configured; every store attempt will fail");
            }
            Ok(Arc::new(GitHubStore::from_settings(github)?))
        }
        StoreSettings::Local(local) => {
            let store = LocalStore::from_settings(local);
            store.init().await?;
            info!("Local config store at: {}", store.directory().display());
            Ok(Arc::new(store))
        }
    }
}

/// Reject names that could escape the target directory
fn check_filename(filename: &str) -> Result<(), StoreError> {
    let valid = !filename.is_empty()
        && !filename.starts_with('.')
        && filename
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(filename.to_string()))
    }
}

/// Request body of `PUT /repos/{repo}/contents/{path}`
#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
}

/// Commits configs to a GitHub repository
pub struct GitHubStore {
    client: reqwest::Client,
    token: Option<String>,
    repo: String,
    branch: String,
    directory: String,
    commit_message: String,
    api_base: String,
    raw_base: String,
}

impl GitHubStore {
    /// Create from settings
    pub fn from_settings(settings: &GitHubSettings) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!("wgforge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            token: settings.token.clone().filter(|t| !t.is_empty()),
            repo: settings.repo.clone(),
            branch: settings.branch.clone(),
            directory: settings.directory.trim_matches('/').to_string(),
            commit_message: settings.commit_message.clone(),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            raw_base: settings.raw_base.trim_end_matches('/').to_string(),
        })
    }

    /// Path of the file inside the repository
    fn object_path(&self, filename: &str) -> String {
        if self.directory.is_empty() {
            filename.to_string()
        } else {
            format!("{}/{}", self.directory, filename)
        }
    }

    /// Contents API endpoint for a file
    fn api_url(&self, filename: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_base,
            self.repo,
            self.object_path(filename)
        )
    }

    /// Raw download URL for a file on the configured branch
    fn raw_url(&self, filename: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.raw_base,
            self.repo,
            self.branch,
            self.object_path(filename)
        )
    }
}

#[async_trait]
impl ConfigStore for GitHubStore {
    async fn store(&self, filename: &str, content: &str) -> Result<StoredConfig, StoreError> {
        check_filename(filename)?;
        let token = self.token.as_deref().ok_or(StoreError::MissingToken)?;

        let body = PutContents {
            message: &self.commit_message,
            content: BASE64.encode(content),
            branch: &self.branch,
        };

        let response = self
            .client
            .put(self.api_url(filename))
            .header(AUTHORIZATION, format!("token {}", token))
            .header(ACCEPT, "application/vnd.github.v3+json")
            .json(&body)
            .send()
            .await
            .map_err(StoreError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!("GitHub rejected {}: {} {}", filename, status, detail);
            return Err(StoreError::Rejected {
                status: status.as_u16(),
            });
        }

        debug!("Committed {} to {}@{}", filename, self.repo, self.branch);
        Ok(StoredConfig {
            url: self.raw_url(filename),
        })
    }
}

/// Writes configs into a local directory
pub struct LocalStore {
    directory: PathBuf,
    public_url: String,
}

impl LocalStore {
    /// Create a store writing under `directory`, published at `public_url`
    pub fn new<P: AsRef<Path>>(directory: P, public_url: &str) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create from settings
    pub fn from_settings(settings: &LocalSettings) -> Self {
        Self::new(&settings.directory, &settings.public_url)
    }

    /// Create the target directory
    pub async fn init(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))
    }

    /// Directory files are written to
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

#[async_trait]
impl ConfigStore for LocalStore {
    async fn store(&self, filename: &str, content: &str) -> Result<StoredConfig, StoreError> {
        check_filename(filename)?;

        let path = self.directory.join(filename);
        fs::write(&path, content)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;

        debug!("Wrote {} ({} bytes)", path.display(), content.len());
        Ok(StoredConfig {
            url: format!("{}/{}", self.public_url, filename),
        })
    }
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("No access token configured")]
    MissingToken,

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Remote rejected the upload (HTTP {status})")]
    Rejected { status: u16 },

    #[error("Request timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl StoreError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StoreError::Timeout
        } else {
            StoreError::Transport(e.to_string())
        }
    }
}
