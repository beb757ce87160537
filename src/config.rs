//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables,
//! then layering command-line overrides on top.

use crate::cli::Cli;
use crate::github::client::DEFAULT_API_URL;
use crate::github::Credentials;
use crate::state::DEFAULT_CONCURRENCY;
use std::path::PathBuf;
use thiserror::Error;

/// Policy document read when neither `--policy` nor `POLICY_FILE` is set
pub const DEFAULT_POLICY_FILE: &str = "company-standard.yml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// GitHub connection configuration
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub api_url: String,
    pub credentials: Credentials,
}

/// Complete application settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Organization to enforce; may still come from `--org`
    pub org: Option<String>,
    pub github: GitHubConfig,
    pub slack_url: Option<String>,
    pub policy_file: PathBuf,
    pub concurrency: usize,
    pub silent: bool,
    pub checks: Vec<String>,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let concurrency = match var("REPO_STANDARD_CONCURRENCY") {
            Some(raw) => parse_concurrency(&raw)?,
            None => DEFAULT_CONCURRENCY,
        };

        Ok(Self {
            org: var("GITHUB_ORG"),
            github: GitHubConfig {
                api_url: var("GITHUB_API_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
                credentials: Self::credentials(&var)?,
            },
            slack_url: var("SLACK_URL"),
            policy_file: var("POLICY_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_POLICY_FILE)),
            concurrency,
            silent: false,
            checks: Vec::new(),
        })
    }

    /// A token wins over app credentials when both are present
    fn credentials<F>(var: &F) -> Result<Credentials, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = var("GITHUB_TOKEN") {
            return Ok(Credentials::Token(token));
        }

        let Some(app_id) = var("GITHUB_APP_ID") else {
            return Err(ConfigError::MissingVar(
                "GITHUB_TOKEN (or GITHUB_APP_ID with app credentials)".to_string(),
            ));
        };

        let private_key = match (var("GITHUB_APP_PRIVATE_KEY"), var("GITHUB_APP_PRIVATE_KEY_FILE")) {
            // Keys passed through env often carry escaped newlines
            (Some(key), _) => key.replace("\\n", "\n"),
            (None, Some(path)) => std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::ReadFile { path, source })?,
            (None, None) => {
                return Err(ConfigError::MissingVar(
                    "GITHUB_APP_PRIVATE_KEY or GITHUB_APP_PRIVATE_KEY_FILE".to_string(),
                ))
            }
        };

        let installation_id = var("GITHUB_APP_INSTALLATION_ID")
            .ok_or_else(|| ConfigError::MissingVar("GITHUB_APP_INSTALLATION_ID".to_string()))?;

        Ok(Credentials::App {
            app_id: parse_id("GITHUB_APP_ID", &app_id)?,
            private_key,
            installation_id: parse_id("GITHUB_APP_INSTALLATION_ID", &installation_id)?,
        })
    }

    /// Command-line values take precedence over the environment
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(org) = &cli.org {
            self.org = Some(org.clone());
        }
        if let Some(policy) = &cli.policy {
            self.policy_file = policy.clone();
        }
        if let Some(webhook) = &cli.webhook {
            self.slack_url = Some(webhook.clone());
        }
        if let Some(concurrency) = cli.concurrency {
            self.concurrency = concurrency.max(1);
        }
        self.silent = cli.silent;
        self.checks = cli.checks.clone();
        self
    }

    /// The organization, which must be set by now
    pub fn require_org(&self) -> Result<&str, ConfigError> {
        self.org
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVar("GITHUB_ORG (or pass --org)".to_string()))
    }
}

fn parse_id(name: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("{} must be a number, got '{}'", name, raw)))
}

fn parse_concurrency(raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue(format!(
            "REPO_STANDARD_CONCURRENCY must be a positive number, got '{}'",
            raw
        ))),
    }
}
