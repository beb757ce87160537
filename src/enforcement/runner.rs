//! Policy runner
//!
//! Evaluates repositories concurrently, bounded by the configured limit.
//! Each repository is an independent task: a failure in one is recorded in
//! the run summary and never stops the others.

use crate::checks::CheckContext;
use crate::enforcement::builtin::{
    branch_protection_findings, license_findings, vulnerability_alert_findings,
};
use crate::error::AppResult;
use crate::models::{Repository, Visibility};
use crate::notify::SERVICE_NAME;
use crate::state::{AppState, SharedState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// Findings for one evaluated repository
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoReport {
    pub repository: String,
    pub findings: Vec<String>,
}

/// A repository whose evaluation failed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoFailure {
    pub repository: String,
    pub error: String,
}

/// Outcome of one enforcement pass
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: Uuid,
    pub repositories_evaluated: usize,
    pub forks_skipped: usize,
    pub total_findings: usize,
    /// Repositories with at least one finding, sorted by name
    pub reports: Vec<RepoReport>,
    pub failures: Vec<RepoFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives a full enforcement pass over an organization
pub struct PolicyRunner {
    state: SharedState,
}

impl PolicyRunner {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// List the organization's repositories and enforce policy on each
    pub async fn run(&self) -> AppResult<RunSummary> {
        let repos = self.discover().await?;
        Ok(self.enforce(repos).await)
    }

    async fn discover(&self) -> AppResult<Vec<Repository>> {
        let repos = self.state.client.list_org_repositories(&self.state.org).await?;
        let public = repos
            .iter()
            .filter(|r| r.visibility() == Visibility::Public)
            .count();

        if !self.state.silent {
            info!("📋 Found {} public repositories", public);
            info!("📋 Found {} private repositories", repos.len() - public);
            info!("📋 Found {} total repositories in {}", repos.len(), self.state.org);
        }

        Ok(repos)
    }

    /// Enforce policy on the given repositories. Forks are skipped.
    pub async fn enforce(&self, repos: Vec<Repository>) -> RunSummary {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let semaphore = Arc::new(Semaphore::new(self.state.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut forks_skipped = 0;

        for repo in repos {
            if repo.fork {
                forks_skipped += 1;
                continue;
            }

            let state = Arc::clone(&self.state);
            let semaphore = Arc::clone(&semaphore);
            let span = info_span!("repository", run = %run_id, name = %repo.name);
            tasks.spawn(
                async move {
                    // The semaphore is never closed
                    let _permit = semaphore.acquire_owned().await.ok();
                    let name = repo.name.clone();
                    process_repository(&state, &repo).await.map_err(|e| RepoFailure {
                        repository: name,
                        error: e.to_string(),
                    })
                }
                .instrument(span),
            );
        }

        let mut reports = Vec::new();
        let mut failures = Vec::new();
        let mut evaluated = 0;

        while let Some(joined) = tasks.join_next().await {
            evaluated += 1;
            match joined {
                Ok(Ok(report)) => {
                    if !report.findings.is_empty() {
                        reports.push(report);
                    }
                }
                Ok(Err(failure)) => {
                    error!("❌ {} - evaluation failed: {}", failure.repository, failure.error);
                    failures.push(failure);
                }
                Err(e) => {
                    error!("❌ Repository task aborted: {}", e);
                    failures.push(RepoFailure {
                        repository: "<unknown>".to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        reports.sort_by(|a, b| a.repository.cmp(&b.repository));
        failures.sort_by(|a, b| a.repository.cmp(&b.repository));
        let total_findings = reports.iter().map(|r| r.findings.len()).sum();

        if !self.state.silent {
            info!("{} total findings", total_findings);
        }
        if forks_skipped > 0 {
            info!("Skipped {} forks", forks_skipped);
        }

        RunSummary {
            run_id,
            repositories_evaluated: evaluated,
            forks_skipped,
            total_findings,
            reports,
            failures,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// All checks for one repository, in order: license, vulnerability alerts,
/// branch protection, then custom checks. Forks produce nothing.
pub async fn evaluate_repository(state: &AppState, repo: &Repository) -> AppResult<Vec<String>> {
    let mut findings = Vec::new();
    if repo.fork {
        return Ok(findings);
    }

    let client = state.client.as_ref();

    findings.extend(license_findings(&state.policy, repo));
    findings.extend(vulnerability_alert_findings(client, &state.org, &state.policy, repo).await?);
    findings.extend(branch_protection_findings(client, &state.org, &state.policy, repo).await?);

    let mut ctx = CheckContext {
        client,
        org: &state.org,
        policy: &state.policy,
        findings: &mut findings,
        silent: state.silent,
    };
    for check in &state.custom_checks {
        check.check(repo, &mut ctx).await?;
    }

    Ok(findings)
}

async fn process_repository(state: &AppState, repo: &Repository) -> AppResult<RepoReport> {
    let findings = evaluate_repository(state, repo).await?;

    if !findings.is_empty() {
        if !state.silent {
            for finding in &findings {
                info!("{} - {}", repo.name, finding);
            }
        }

        if let Some(notifier) = state.notifier.as_ref().filter(|_| state.should_notify()) {
            let title = format!("Repo Findings for {}", repo.name);
            if let Err(e) = notifier.notify(SERVICE_NAME, &title, &findings).await {
                error!("Failed to notify findings for {}: {}", repo.name, e);
            }
        }
    }

    Ok(RepoReport {
        repository: repo.name.clone(),
        findings,
    })
}
