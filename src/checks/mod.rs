//! Custom Checks
//!
//! Pluggable per-repository checks that run after the built-in license,
//! vulnerability alert and branch protection checks. A check reports by
//! pushing onto the repository's findings; an error aborts the remaining
//! processing for that repository only.
//!
//! The enforcement helpers a check may need are ordinary crate functions:
//! [`crate::policy::should_enforce`], [`crate::policy::should_remediate`],
//! [`crate::settings::coerce::coerce`] and [`crate::settings::ReconciliationEngine`].

pub mod jenkinsfile;

pub use jenkinsfile::JenkinsfileCheck;

use crate::error::{config_error, AppResult};
use crate::github::RepoClient;
use crate::models::Repository;
use crate::policy::PolicyDocument;
use async_trait::async_trait;
use std::sync::Arc;

/// Names accepted by `--check`
pub const BUILTIN_CHECKS: &[&str] = &[JenkinsfileCheck::NAME];

/// Everything a custom check may use while evaluating one repository
pub struct CheckContext<'a> {
    pub client: &'a dyn RepoClient,
    pub org: &'a str,
    pub policy: &'a PolicyDocument,
    /// Findings for this repository so far; append to report
    pub findings: &'a mut Vec<String>,
    pub silent: bool,
}

/// A repository check contributed outside the built-in set
#[async_trait]
pub trait CustomCheck: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self, repo: &Repository, ctx: &mut CheckContext<'_>) -> AppResult<()>;
}

/// Resolve a bundled check by name
pub fn builtin(name: &str) -> AppResult<Arc<dyn CustomCheck>> {
    match name {
        JenkinsfileCheck::NAME => Ok(Arc::new(JenkinsfileCheck)),
        other => Err(config_error(format!(
            "Unknown check '{}' (available: {})",
            other,
            BUILTIN_CHECKS.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_builtin_checks() {
        assert_eq!(builtin("jenkinsfile").unwrap().name(), "jenkinsfile");
        assert!(builtin("dockerfile").is_err());
    }
}
