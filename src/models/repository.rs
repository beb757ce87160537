//! Repository model
//!
//! Represents one repository in an organization, as returned by the
//! organization repository listing. Read-only to the enforcement core.

use serde::{Deserialize, Serialize};

/// License attached to a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// SPDX-like license key (e.g., "mit", "apache-2.0")
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Repository represents one listed repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub license: Option<License>,
    #[serde(default = "default_branch_name")]
    pub default_branch: String,
}

fn default_branch_name() -> String {
    "main".to_string()
}

/// Visibility scope a policy is keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Repository {
    pub fn visibility(&self) -> Visibility {
        if self.private {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }

    /// License key, if the repository has a license
    pub fn license_key(&self) -> Option<&str> {
        self.license.as_ref().map(|l| l.key.as_str())
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Visibility::Public => write!(f, "Public"),
            Visibility::Private => write!(f, "Private"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_listing_entry() {
        let json = serde_json::json!({
            "id": 1296269,
            "name": "hello-world",
            "private": true,
            "fork": false,
            "license": { "key": "mit", "name": "MIT License", "spdx_id": "MIT" },
            "default_branch": "master",
            "url": "https://api.github.com/repos/octocat/hello-world"
        });
        let repo: Repository = serde_json::from_value(json).unwrap();

        assert_eq!(repo.name, "hello-world");
        assert_eq!(repo.visibility(), Visibility::Private);
        assert_eq!(repo.license_key(), Some("mit"));
        assert_eq!(repo.default_branch, "master");
    }

    #[test]
    fn test_null_license() {
        let json = serde_json::json!({ "name": "bare", "license": null });
        let repo: Repository = serde_json::from_value(json).unwrap();

        assert!(repo.license.is_none());
        assert_eq!(repo.visibility(), Visibility::Public);
        assert_eq!(repo.default_branch, "main");
    }
}
