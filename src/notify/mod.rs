//! Finding Notifications
//!
//! Delivers per-repository findings to a chat webhook. Delivery failures are
//! reported to the caller, which logs and swallows them.

pub mod slack;

pub use slack::SlackNotifier;

use crate::error::AppResult;
use async_trait::async_trait;

/// Service name attached to every notification
pub const SERVICE_NAME: &str = "github repo standard";

/// Somewhere findings can be sent
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, service: &str, title: &str, messages: &[String]) -> AppResult<()>;
}
