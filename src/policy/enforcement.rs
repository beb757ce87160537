//! Enforcement Decisions
//!
//! Decides whether a policy section is inert, observe-only or auto-fix for a
//! given repository. Pure functions: no I/O, and missing input always means
//! "no applicable policy", never an error.

use crate::models::Repository;
use crate::policy::{AllowedLicensePolicy, BranchProtectionPolicy, PolicySection};
use serde::{Deserialize, Deserializer};

/// Per-section enforcement mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcementMode {
    /// Report findings only
    Notify,
    /// Report findings and write the fix back
    Remediate,
    /// Any unrecognized value; never enforced
    Inert,
}

impl EnforcementMode {
    pub fn from_value(value: &str) -> Self {
        match value {
            "notify" => EnforcementMode::Notify,
            "remediate" => EnforcementMode::Remediate,
            _ => EnforcementMode::Inert,
        }
    }
}

/// Deserialize `enforcement_policy`, mapping any non-string value to `Inert`
pub(crate) fn deserialize_mode<'de, D>(deserializer: D) -> Result<Option<EnforcementMode>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(EnforcementMode::from_value(&s)),
        Some(_) => Some(EnforcementMode::Inert),
    })
}

/// Any policy section carrying enforcement fields
pub trait AsPolicySection {
    fn policy_section(&self) -> &PolicySection;
}

impl AsPolicySection for PolicySection {
    fn policy_section(&self) -> &PolicySection {
        self
    }
}

impl AsPolicySection for AllowedLicensePolicy {
    fn policy_section(&self) -> &PolicySection {
        &self.section
    }
}

impl AsPolicySection for BranchProtectionPolicy {
    fn policy_section(&self) -> &PolicySection {
        &self.section
    }
}

/// Whether a section applies to a repository.
///
/// False when the section is absent, has no `enforcement_policy`, or names the
/// repository in `repo_exceptions`. Without a repository, exceptions do not
/// apply.
pub fn should_enforce<S>(section: Option<&S>, repo: Option<&Repository>) -> bool
where
    S: AsPolicySection + ?Sized,
{
    let Some(section) = section.map(|s| s.policy_section()) else {
        return false;
    };
    let Some(mode) = section.enforcement_policy else {
        return false;
    };
    if let Some(repo) = repo {
        if section.repo_exceptions.iter().any(|name| name == &repo.name) {
            return false;
        }
    }
    matches!(mode, EnforcementMode::Notify | EnforcementMode::Remediate)
}

/// Whether drift in this section may be fixed automatically
pub fn should_remediate<S>(section: Option<&S>, repo: Option<&Repository>) -> bool
where
    S: AsPolicySection + ?Sized,
{
    should_enforce(section, repo)
        && section
            .map(|s| s.policy_section().enforcement_policy == Some(EnforcementMode::Remediate))
            .unwrap_or(false)
}
