//! Policy Document
//!
//! The declarative governance policy, keyed by visibility scope and then by
//! section name. Loaded once per run from YAML and shared read-only across
//! every repository evaluation.
//!
//! ```yaml
//! alertSlack: true
//! public:
//!   licenses:
//!     allowed:
//!       enforcement_policy: notify
//!       approvedKeys: [mit, apache-2.0]
//!     mandatory:
//!       enforcement_policy: notify
//!       repo_exceptions: [scratchpad]
//!   vulnerabilityChecks:
//!     enforcement_policy: remediate
//!   defaultBranchProtections:
//!     enforcement_policy: remediate
//!     protections:
//!       allow_force_pushes: false
//! ```

pub mod enforcement;

pub use enforcement::{should_enforce, should_remediate, EnforcementMode};

use crate::error::{AppError, AppResult};
use crate::models::{Repository, Visibility};
use crate::settings::SettingsNode;
use serde::{Deserialize, Deserializer};
use std::path::Path;
use tracing::debug;

/// Enforcement fields shared by every policy section
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PolicySection {
    #[serde(default, deserialize_with = "enforcement::deserialize_mode")]
    pub enforcement_policy: Option<EnforcementMode>,
    /// Repositories exempted regardless of the enforcement policy
    #[serde(default, deserialize_with = "string_or_list")]
    pub repo_exceptions: Vec<String>,
}

/// `licenses.allowed`: only approved license keys may be used
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AllowedLicensePolicy {
    #[serde(flatten)]
    pub section: PolicySection,
    #[serde(rename = "approvedKeys", default, deserialize_with = "string_or_list")]
    pub approved_keys: Vec<String>,
}

/// `licenses` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LicensePolicy {
    #[serde(default)]
    pub allowed: Option<AllowedLicensePolicy>,
    #[serde(default)]
    pub mandatory: Option<PolicySection>,
}

/// `defaultBranchProtections`: target settings in write-back shape
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BranchProtectionPolicy {
    #[serde(flatten)]
    pub section: PolicySection,
    #[serde(default)]
    pub protections: SettingsNode,
}

/// All sections for one visibility scope
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisibilityPolicy {
    #[serde(default)]
    pub licenses: Option<LicensePolicy>,
    #[serde(rename = "vulnerabilityChecks", default)]
    pub vulnerability_checks: Option<PolicySection>,
    #[serde(rename = "defaultBranchProtections", default)]
    pub default_branch_protections: Option<BranchProtectionPolicy>,
}

/// Complete policy document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyDocument {
    /// Forward findings to the notification webhook
    #[serde(rename = "alertSlack", default)]
    pub alert_slack: bool,
    #[serde(default)]
    pub public: Option<VisibilityPolicy>,
    #[serde(default)]
    pub private: Option<VisibilityPolicy>,
}

impl PolicyDocument {
    /// Load a policy document from a YAML file
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Policy(format!("Failed to read policy file {}: {}", path.display(), e))
        })?;
        let policy = Self::from_yaml_str(&raw)?;
        debug!("Loaded policy document from {}", path.display());
        Ok(policy)
    }

    /// Parse a policy document from YAML text
    pub fn from_yaml_str(raw: &str) -> AppResult<Self> {
        // An empty file is an empty policy, not an error
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|e| AppError::Policy(format!("Invalid policy document: {}", e)))
    }

    pub fn for_visibility(&self, visibility: Visibility) -> Option<&VisibilityPolicy> {
        match visibility {
            Visibility::Public => self.public.as_ref(),
            Visibility::Private => self.private.as_ref(),
        }
    }

    fn scope(&self, repo: &Repository) -> Option<&VisibilityPolicy> {
        self.for_visibility(repo.visibility())
    }

    pub fn allowed_licenses(&self, repo: &Repository) -> Option<&AllowedLicensePolicy> {
        self.scope(repo)?.licenses.as_ref()?.allowed.as_ref()
    }

    pub fn mandatory_license(&self, repo: &Repository) -> Option<&PolicySection> {
        self.scope(repo)?.licenses.as_ref()?.mandatory.as_ref()
    }

    pub fn vulnerability_checks(&self, repo: &Repository) -> Option<&PolicySection> {
        self.scope(repo)?.vulnerability_checks.as_ref()
    }

    pub fn branch_protections(&self, repo: &Repository) -> Option<&BranchProtectionPolicy> {
        self.scope(repo)?.default_branch_protections.as_ref()
    }
}

/// Accept `key`, `[a, b]` or null for list-valued policy fields
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    })
}
