//! In-memory [`RepoClient`] for tests

use crate::error::{not_found_error, AppError, AppResult};
use crate::github::RepoClient;
use crate::models::{License, Repository};
use crate::settings::SettingsNode;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Scripted platform state plus a log of write calls
#[derive(Default)]
pub struct FakeClient {
    pub repos: Vec<Repository>,
    pub protections: HashMap<String, SettingsNode>,
    pub alerts_enabled: HashSet<String>,
    /// Repositories whose alert probe fails with a non-404 error
    pub alerts_broken: HashSet<String>,
    /// Repositories whose alert probe answers with this status
    pub alerts_status: HashMap<String, u16>,
    pub files: HashMap<(String, String), String>,
    /// File reads fail with a non-404 error
    pub files_broken: bool,
    pub fail_writes: bool,
    pub updates: Mutex<Vec<(String, String, SettingsNode)>>,
    pub enabled_alerts: Mutex<Vec<String>>,
}

impl FakeClient {
    pub fn repo(name: &str, private: bool, license: Option<&str>) -> Repository {
        Repository {
            name: name.to_string(),
            private,
            fork: false,
            license: license.map(|key| License {
                key: key.to_string(),
                name: None,
            }),
            default_branch: "main".to_string(),
        }
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    fn write_failure(&self) -> AppError {
        AppError::Remote {
            status: StatusCode::FORBIDDEN,
            message: "Resource not accessible by integration".to_string(),
        }
    }
}

#[async_trait]
impl RepoClient for FakeClient {
    async fn list_org_repositories(&self, _org: &str) -> AppResult<Vec<Repository>> {
        Ok(self.repos.clone())
    }

    async fn get_branch_protection(&self, _org: &str, repo: &str, _branch: &str) -> AppResult<SettingsNode> {
        self.protections
            .get(repo)
            .cloned()
            .ok_or_else(|| not_found_error("Branch not protected"))
    }

    async fn update_branch_protection(
        &self,
        _org: &str,
        repo: &str,
        branch: &str,
        settings: &SettingsNode,
    ) -> AppResult<()> {
        if self.fail_writes {
            return Err(self.write_failure());
        }
        self.updates
            .lock()
            .unwrap()
            .push((repo.to_string(), branch.to_string(), settings.clone()));
        Ok(())
    }

    async fn vulnerability_alerts_status(&self, _org: &str, repo: &str) -> AppResult<u16> {
        if self.alerts_broken.contains(repo) {
            return Err(AppError::Remote {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "boom".to_string(),
            });
        }
        if let Some(status) = self.alerts_status.get(repo) {
            return Ok(*status);
        }
        if self.alerts_enabled.contains(repo) {
            Ok(204)
        } else {
            Err(not_found_error("Vulnerability alerts are disabled"))
        }
    }

    async fn enable_vulnerability_alerts(&self, _org: &str, repo: &str) -> AppResult<bool> {
        if self.fail_writes {
            return Err(self.write_failure());
        }
        self.enabled_alerts.lock().unwrap().push(repo.to_string());
        Ok(true)
    }

    async fn get_file_contents(&self, _org: &str, repo: &str, path: &str) -> AppResult<String> {
        if self.files_broken {
            return Err(AppError::Remote {
                status: StatusCode::BAD_GATEWAY,
                message: "connection reset".to_string(),
            });
        }
        self.files
            .get(&(repo.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| not_found_error(format!("{} not found", path)))
    }
}
