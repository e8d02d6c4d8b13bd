//! Server settings
//!
//! Read from an optional TOML file, then overridden from `WGFORGE_*`
//! environment variables. Everything has a default except the GitHub token.

use crate::messages::Locale;
use clap::Parser;
use serde::Deserialize;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use url::Url;
use wgforge_core::{GeneratorOptions, DEFAULT_DNS_COUNT, PRIMARY_DNS};

/// Environment variable naming the settings file
pub const CONFIG_ENV: &str = "WGFORGE_CONFIG";

/// Upper bound for `dns_count`
const MAX_DNS_COUNT: usize = 64;

/// Top-level settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Listen address
    pub bind_address: String,
    /// Language of error messages
    pub locale: Locale,
    /// Optional `.toml`/`.json` range table replacing the built-in one
    pub ranges_file: Option<PathBuf>,
    /// Random resolvers per config
    pub dns_count: usize,
    /// Fixed first resolver
    pub primary_dns: Ipv4Addr,
    /// Where generated configs are published
    pub store: StoreSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            locale: Locale::default(),
            ranges_file: None,
            dns_count: DEFAULT_DNS_COUNT,
            primary_dns: PRIMARY_DNS,
            store: StoreSettings::default(),
        }
    }
}

/// Persistence backend
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreSettings {
    /// Commit through the GitHub contents API
    #[serde(rename = "github")]
    GitHub(GitHubSettings),
    /// Write into a local directory served by this process
    Local(LocalSettings),
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings::GitHub(GitHubSettings::default())
    }
}

/// GitHub contents API settings
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct GitHubSettings {
    /// Personal access token (never logged)
    pub token: Option<String>,
    /// `owner/name`
    pub repo: String,
    pub branch: String,
    /// Directory inside the repository
    pub directory: String,
    pub commit_message: String,
    pub api_base: String,
    /// Base of the public raw-content URLs
    pub raw_base: String,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            token: None,
            repo: "ekhlasi/permag.ir".to_string(),
            branch: "main".to_string(),
            directory: "configs".to_string(),
            commit_message: "Add generated WireGuard config".to_string(),
            api_base: "https://api.github.com".to_string(),
            raw_base: "https://raw.githubusercontent.com".to_string(),
            timeout_secs: 15,
        }
    }
}

impl fmt::Debug for GitHubSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubSettings")
            .field("token", &self.token.as_ref().map(|_| "[redacted]"))
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("directory", &self.directory)
            .field("commit_message", &self.commit_message)
            .field("api_base", &self.api_base)
            .field("raw_base", &self.raw_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Local directory settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalSettings {
    /// Directory the files are written to
    pub directory: PathBuf,
    /// Public URL the directory is reachable at (served under `/configs`)
    pub public_url: String,
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./configs"),
            public_url: "http://localhost:3000/configs".to_string(),
        }
    }
}

impl Settings {
    /// Load settings: file (if any), then environment, then validate
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut settings = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Load from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        toml::from_str(content).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Apply `WGFORGE_*` overrides from `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("WGFORGE_BIND") {
            self.bind_address = bind;
        }
        if let Some(locale) = lookup("WGFORGE_LOCALE") {
            self.locale = locale.parse().map_err(SettingsError::Invalid)?;
        }
        if let Some(ranges) = lookup("WGFORGE_RANGES") {
            self.ranges_file = Some(PathBuf::from(ranges));
        }
        if let StoreSettings::GitHub(github) = &mut self.store {
            if let Some(token) = lookup("WGFORGE_GITHUB_TOKEN") {
                github.token = Some(token);
            }
            if let Some(repo) = lookup("WGFORGE_GITHUB_REPO") {
                github.repo = repo;
            }
        }
        Ok(())
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.bind_address
            .parse::<SocketAddr>()
            .map_err(|_| SettingsError::Invalid(format!("bind address {}", self.bind_address)))?;

        if self.dns_count > MAX_DNS_COUNT {
            return Err(SettingsError::Invalid(format!(
                "dns_count {} exceeds {}",
                self.dns_count, MAX_DNS_COUNT
            )));
        }

        match &self.store {
            StoreSettings::GitHub(github) => {
                let mut parts = github.repo.split('/');
                let valid_repo = matches!(
                    (parts.next(), parts.next(), parts.next()),
                    (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
                );
                if !valid_repo {
                    return Err(SettingsError::Invalid(format!("repo {}", github.repo)));
                }
                if github.branch.is_empty() {
                    return Err(SettingsError::Invalid("empty branch".to_string()));
                }
                if github.timeout_secs == 0 {
                    return Err(SettingsError::Invalid("timeout_secs must be positive".to_string()));
                }
                parse_url(&github.api_base)?;
                parse_url(&github.raw_base)?;
            }
            StoreSettings::Local(local) => {
                parse_url(&local.public_url)?;
            }
        }
        Ok(())
    }

    /// Socket address to listen on (validated by [`Settings::validate`])
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        self.bind_address
            .parse()
            .map_err(|_| SettingsError::Invalid(format!("bind address {}", self.bind_address)))
    }

    /// Generator options derived from these settings
    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            dns_count: self.dns_count,
            primary_dns: self.primary_dns,
        }
    }
}

fn parse_url(raw: &str) -> Result<Url, SettingsError> {
    let url = Url::parse(raw).map_err(|e| SettingsError::Invalid(format!("url {}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(SettingsError::Invalid(format!("url {}: scheme {}", raw, other))),
    }
}

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "wgforge-server", version, about, long_about = None)]
pub struct Cli {
    /// Settings file (TOML)
    #[arg(long, value_name = "PATH", env = CONFIG_ENV)]
    pub config: Option<PathBuf>,
}

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Cannot read settings: {0}")]
    Io(String),

    #[error("Cannot parse settings: {0}")]
    Parse(String),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();

        assert_eq!(settings.bind_address, "0.0.0.0:3000");
        assert_eq!(settings.locale, Locale::Fa);
        assert_eq!(settings.generator_options(), GeneratorOptions::default());
        assert!(settings.validate().is_ok());

        let StoreSettings::GitHub(github) = &settings.store else {
            panic!("expected GitHub backend");
        };
        assert_eq!(github.repo, "ekhlasi/permag.ir");
        assert_eq!(github.directory, "configs");
        assert!(github.token.is_none());
    }

    #[test]
    fn test_parse_github_file() {
        let settings = Settings::from_toml(
            r#"
            bind_address = "127.0.0.1:8080"
            locale = "en"
            dns_count = 3

            [store]
            backend = "github"
            repo = "acme/configs"
            branch = "published"
            "#,
        )
        .unwrap();

        assert_eq!(settings.bind_addr().unwrap().port(), 8080);
        assert_eq!(settings.locale, Locale::En);
        assert_eq!(settings.generator_options().dns_count, 3);

        let StoreSettings::GitHub(github) = &settings.store else {
            panic!("expected GitHub backend");
        };
        assert_eq!(github.repo, "acme/configs");
        assert_eq!(github.branch, "published");
        assert_eq!(github.timeout_secs, 15);
    }

    #[test]
    fn test_example_file() {
        let settings = Settings::from_toml(include_str!("../../../config/wgforge.example.toml")).unwrap();

        assert!(settings.validate().is_ok());
        assert_eq!(settings.generator_options(), GeneratorOptions::default());
        assert!(matches!(settings.store, StoreSettings::GitHub(_)));
    }

    #[test]
    fn test_parse_local_file() {
        let settings = Settings::from_toml(
            r#"
            [store]
            backend = "local"
            directory = "/var/lib/wgforge"
            public_url = "https://vpn.example.com/configs"
            "#,
        )
        .unwrap();

        let StoreSettings::Local(local) = &settings.store else {
            panic!("expected local backend");
        };
        assert_eq!(local.directory, PathBuf::from("/var/lib/wgforge"));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[
                ("WGFORGE_BIND", "127.0.0.1:9999"),
                ("WGFORGE_LOCALE", "en"),
                ("WGFORGE_GITHUB_TOKEN", "ghp_secret"),
                ("WGFORGE_RANGES", "/etc/wgforge/ranges.toml"),
            ]))
            .unwrap();

        assert_eq!(settings.bind_address, "127.0.0.1:9999");
        assert_eq!(settings.locale, Locale::En);
        assert_eq!(settings.ranges_file, Some(PathBuf::from("/etc/wgforge/ranges.toml")));

        let StoreSettings::GitHub(github) = &settings.store else {
            panic!("expected GitHub backend");
        };
        assert_eq!(github.token.as_deref(), Some("ghp_secret"));
    }

    #[test]
    fn test_bad_locale_env() {
        let mut settings = Settings::default();
        let result = settings.apply_env(env(&[("WGFORGE_LOCALE", "klingon")]));
        assert!(matches!(result, Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_token_is_redacted() {
        let github = GitHubSettings {
            token: Some("ghp_secret".to_string()),
            ..GitHubSettings::default()
        };
        let debug = format!("{:?}", github);

        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("[redacted]"));
    }

    #[test]
    fn test_validation_failures() {
        let bad_bind = Settings {
            bind_address: "nowhere".to_string(),
            ..Settings::default()
        };
        assert!(bad_bind.validate().is_err());

        let too_many_dns = Settings {
            dns_count: 1000,
            ..Settings::default()
        };
        assert!(too_many_dns.validate().is_err());

        let bad_repo = Settings {
            store: StoreSettings::GitHub(GitHubSettings {
                repo: "no-owner".to_string(),
                ..GitHubSettings::default()
            }),
            ..Settings::default()
        };
        assert!(bad_repo.validate().is_err());

        let bad_url = Settings {
            store: StoreSettings::Local(LocalSettings {
                public_url: "ftp://example.com/configs".to_string(),
                ..LocalSettings::default()
            }),
            ..Settings::default()
        };
        assert!(bad_url.validate().is_err());
    }

    #[test]
    fn test_cli_config_flag() {
        let cli = Cli::try_parse_from(["wgforge-server", "--config", "a.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("a.toml")));

        let cli = Cli::try_parse_from(["wgforge-server", "--config=b.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("b.toml")));
    }

    #[test]
    fn test_cli_rejects_bad_arguments() {
        let err = Cli::try_parse_from(["wgforge-server", "--confg", "x.toml"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);

        // A bare flag must not fall back to the environment
        let err = Cli::try_parse_from(["wgforge-server", "--config"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);

        let err = Cli::try_parse_from(["wgforge-server", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }
}
