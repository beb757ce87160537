//! repo-standard - GitHub Repository Governance
//!
//! Enforces an organization-wide policy document against every repository
//! in a GitHub organization:
//! - License presence and license allow-list
//! - Vulnerability alert enablement
//! - Default branch protection settings
//! - Optional bundled custom checks
//!
//! Each policy section is inert, notify-only or auto-remediating, with
//! per-repository exceptions. Findings are logged and optionally sent to Slack.

mod checks;
mod cli;
mod config;
mod enforcement;
mod error;
mod github;
mod models;
mod notify;
mod policy;
mod settings;
mod state;

use crate::cli::Cli;
use crate::config::Settings;
use crate::enforcement::PolicyRunner;
use crate::github::{GitHubClient, GitHubClientConfig};
use crate::notify::SlackNotifier;
use crate::policy::PolicyDocument;
use crate::state::AppState;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting repo-standard - GitHub Repository Governance...");

    let settings = Settings::load()?.with_overrides(&cli);
    let org = settings.require_org()?.to_string();
    info!("📋 Configuration loaded successfully");

    let policy = PolicyDocument::load(&settings.policy_file)?;
    info!("📋 Policy loaded from {}", settings.policy_file.display());

    let client = GitHubClient::new(
        GitHubClientConfig {
            api_url: settings.github.api_url.clone(),
            ..GitHubClientConfig::default()
        },
        settings.github.credentials.clone(),
    )?;

    let custom_checks = settings
        .checks
        .iter()
        .map(|name| checks::builtin(name))
        .collect::<Result<Vec<_>, _>>()?;

    let alert_slack = policy.alert_slack;
    let mut state = AppState::new(org, Arc::new(client), policy)
        .with_custom_checks(custom_checks)
        .silent(settings.silent)
        .with_concurrency(settings.concurrency);

    match settings.slack_url.as_deref() {
        Some(url) => state = state.with_notifier(Arc::new(SlackNotifier::new(url)?)),
        None if alert_slack => warn!("⚠️  alertSlack is set but no webhook configured, findings will not be sent"),
        None => {}
    }

    info!("🔎 Discovering repositories in {}...", state.org);
    let summary = PolicyRunner::new(Arc::new(state)).run().await?;

    info!(
        "✅ Run {} finished: {} evaluated, {} forks skipped, {} findings",
        summary.run_id, summary.repositories_evaluated, summary.forks_skipped, summary.total_findings
    );

    if !summary.is_success() {
        for failure in &summary.failures {
            error!("❌ {}: {}", failure.repository, failure.error);
        }
        anyhow::bail!("{} repositories could not be evaluated", summary.failures.len());
    }

    Ok(())
}

/// Initialize the tracing subscriber with environment-based filtering
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,repo_standard=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}
