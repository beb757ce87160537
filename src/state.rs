//! Run state management
//!
//! Contains the state shared read-only by every concurrent repository
//! evaluation. Built once per run; nothing in it is mutated afterwards.

use crate::checks::CustomCheck;
use crate::github::RepoClient;
use crate::notify::Notifier;
use crate::policy::PolicyDocument;
use std::sync::Arc;

/// Default number of repositories evaluated at once
pub const DEFAULT_CONCURRENCY: usize = 16;

/// State shared across all repository tasks
pub struct AppState {
    /// Organization being enforced
    pub org: String,

    /// Remote platform client (one per run)
    pub client: Arc<dyn RepoClient>,

    /// Governance policy for this run
    pub policy: PolicyDocument,

    /// Where findings are delivered, if anywhere
    pub notifier: Option<Arc<dyn Notifier>>,

    /// Checks run after the built-in ones, in order
    pub custom_checks: Vec<Arc<dyn CustomCheck>>,

    /// Suppress per-finding output
    pub silent: bool,

    /// Upper bound on concurrently evaluated repositories
    pub concurrency: usize,
}

impl AppState {
    pub fn new(org: impl Into<String>, client: Arc<dyn RepoClient>, policy: PolicyDocument) -> Self {
        Self {
            org: org.into(),
            client,
            policy,
            notifier: None,
            custom_checks: Vec::new(),
            silent: false,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_custom_checks(mut self, checks: Vec<Arc<dyn CustomCheck>>) -> Self {
        self.custom_checks = checks;
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Notifications go out only when the policy asks for them and a
    /// webhook is configured
    pub fn should_notify(&self) -> bool {
        self.policy.alert_slack && self.notifier.is_some()
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
