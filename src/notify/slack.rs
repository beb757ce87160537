//! Slack incoming-webhook delivery
//!
//! Findings are rendered as Block Kit blocks: the service name, a header with
//! the title, and one mrkdwn field per finding.

use crate::error::{AppError, AppResult};
use crate::notify::Notifier;
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

/// Block Kit text object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextObject {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

impl TextObject {
    fn plain(text: impl Into<String>) -> Self {
        Self { kind: "plain_text", text: text.into() }
    }

    fn mrkdwn(text: impl Into<String>) -> Self {
        Self { kind: "mrkdwn", text: text.into() }
    }
}

/// Block Kit layout block
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<TextObject>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fields: Option<Vec<TextObject>>,
    },
    Divider,
    Header {
        text: TextObject,
    },
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    blocks: &'a [Block],
}

/// Lay out findings as Block Kit blocks
pub fn block_format(service: &str, title: &str, messages: &[String]) -> Vec<Block> {
    vec![
        Block::Section {
            text: Some(TextObject::plain(service)),
            fields: None,
        },
        Block::Divider,
        Block::Header {
            text: TextObject::plain(title),
        },
        Block::Section {
            text: None,
            fields: Some(messages.iter().map(|m| TextObject::mrkdwn(m.as_str())).collect()),
        },
        Block::Divider,
    ]
}

/// Posts findings to a Slack incoming webhook
pub struct SlackNotifier {
    http: reqwest::Client,
    webhook_url: url::Url,
}

impl SlackNotifier {
    pub fn new(webhook_url: &str) -> AppResult<Self> {
        let webhook_url = url::Url::parse(webhook_url)
            .map_err(|e| AppError::Config(format!("Invalid Slack webhook URL: {}", e)))?;
        Ok(Self {
            http: reqwest::Client::new(),
            webhook_url,
        })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, service: &str, title: &str, messages: &[String]) -> AppResult<()> {
        let blocks = block_format(service, title, messages);
        let response = self
            .http
            .post(self.webhook_url.clone())
            .json(&WebhookPayload { blocks: &blocks })
            .send()
            .await
            .map_err(|e| AppError::Notification(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Notification(format!("Slack returned {}: {}", status, body)));
        }

        debug!("Delivered {} findings to Slack: {}", messages.len(), title);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_block_format_layout() {
        let blocks = block_format(
            "github repo standard",
            "Repo Findings for svc",
            &["svc does not have vulnerability alerts enabled!".to_string()],
        );

        assert_eq!(
            serde_json::to_value(WebhookPayload { blocks: &blocks }).unwrap(),
            json!({
                "blocks": [
                    { "type": "section", "text": { "type": "plain_text", "text": "github repo standard" } },
                    { "type": "divider" },
                    { "type": "header", "text": { "type": "plain_text", "text": "Repo Findings for svc" } },
                    { "type": "section", "fields": [
                        { "type": "mrkdwn", "text": "svc does not have vulnerability alerts enabled!" }
                    ] },
                    { "type": "divider" }
                ]
            })
        );
    }

    #[test]
    fn test_invalid_webhook_url() {
        assert!(matches!(SlackNotifier::new("not a url"), Err(AppError::Config(_))));
    }
}
