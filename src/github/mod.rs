//! Remote Repository Client
//!
//! The boundary between the enforcement core and the hosting platform.
//! A "not found" response is always surfaced as [`AppError::NotFound`] so
//! callers can tell "feature absent" apart from real failures.

pub mod auth;
pub mod client;
#[cfg(test)]
pub mod fake;

pub use auth::Credentials;
pub use client::{GitHubClient, GitHubClientConfig};

use crate::error::AppResult;
use crate::models::Repository;
use crate::settings::SettingsNode;
use async_trait::async_trait;

/// Operations the enforcement run needs from the platform
#[async_trait]
pub trait RepoClient: Send + Sync {
    /// Every repository in the organization, all pages
    async fn list_org_repositories(&self, org: &str) -> AppResult<Vec<Repository>>;

    /// Raw branch protection settings as returned by the read endpoint
    async fn get_branch_protection(&self, org: &str, repo: &str, branch: &str) -> AppResult<SettingsNode>;

    /// Replace branch protection with a complete update payload
    async fn update_branch_protection(
        &self,
        org: &str,
        repo: &str,
        branch: &str,
        settings: &SettingsNode,
    ) -> AppResult<()>;

    /// HTTP status of the vulnerability alert probe (204 means enabled)
    async fn vulnerability_alerts_status(&self, org: &str, repo: &str) -> AppResult<u16>;

    /// Enable vulnerability alerts; true when the platform confirmed with 204
    async fn enable_vulnerability_alerts(&self, org: &str, repo: &str) -> AppResult<bool>;

    /// Decoded contents of a file on the default branch
    async fn get_file_contents(&self, org: &str, repo: &str, path: &str) -> AppResult<String>;
}
