//! GitHub REST client
//!
//! Thin `reqwest` wrapper implementing [`RepoClient`]: authentication,
//! pagination over `Link` headers, and a single retry when the primary rate
//! limit is exhausted. Secondary (abuse) limits are logged and not retried.

use crate::error::{AppError, AppResult};
use crate::github::auth::{Credentials, TokenProvider};
use crate::github::RepoClient;
use crate::models::Repository;
use crate::settings::SettingsNode;
use async_trait::async_trait;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER, USER_AGENT};
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";

const CLIENT_USER_AGENT: &str = "repo-standard";

/// Never sleep longer than this for a rate limit reset
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

static NEXT_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<([^>]+)>;\s*rel="next""#).expect("static regex is valid")
});

/// Client configuration
#[derive(Debug, Clone)]
pub struct GitHubClientConfig {
    /// API base URL (no trailing slash)
    pub api_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Page size for listings
    pub per_page: u32,
}

impl Default for GitHubClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
            per_page: 100,
        }
    }
}

/// How a response relates to rate limiting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimit {
    /// Not rate limited
    None,
    /// Quota exhausted; retry once after the delay
    Primary(Duration),
    /// Abuse detection; do not retry
    Secondary,
}

/// Classify a response for rate limiting
pub fn classify_rate_limit(status: StatusCode, headers: &HeaderMap, now_epoch: u64) -> RateLimit {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return RateLimit::None;
    }

    let header_u64 = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    };

    if header_u64("x-ratelimit-remaining") == Some(0) {
        let wait = header_u64("x-ratelimit-reset")
            .map(|reset| Duration::from_secs(reset.saturating_sub(now_epoch)))
            .unwrap_or(Duration::from_secs(1));
        return RateLimit::Primary(wait.min(MAX_RATE_LIMIT_WAIT));
    }

    if headers.contains_key(RETRY_AFTER) {
        return RateLimit::Secondary;
    }

    RateLimit::None
}

/// URL of the next page, from a `Link` header
pub fn next_page_link(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(reqwest::header::LINK)?.to_str().ok()?;
    NEXT_LINK
        .captures(link)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

/// Decode a contents API payload
fn decode_content(payload: ContentResponse) -> AppResult<String> {
    if payload.encoding.as_deref().unwrap_or("base64") != "base64" {
        return Ok(payload.content);
    }
    let compact: String = payload.content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| AppError::Internal(format!("Invalid base64 file content: {}", e)))?;
    // Invalid UTF-8 (e.g. a Latin-1 comment) is replaced, not rejected
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// GitHub implementation of [`RepoClient`]
pub struct GitHubClient {
    http: reqwest::Client,
    config: GitHubClientConfig,
    tokens: TokenProvider,
}

impl GitHubClient {
    pub fn new(config: GitHubClientConfig, credentials: Credentials) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .gzip(true)
            .build()?;

        info!("🔗 GitHub client ready for {} ({:?})", config.api_url, credentials);

        Ok(Self {
            http,
            config,
            tokens: TokenProvider::new(credentials),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// Send one request, retrying once on an exhausted primary rate limit
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> AppResult<Response> {
        let mut retried = false;
        loop {
            let token = self.tokens.token(&self.http, &self.config.api_url).await?;
            let mut request = self
                .http
                .request(method.clone(), url)
                .bearer_auth(token)
                .header(USER_AGENT, CLIENT_USER_AGENT)
                .header(ACCEPT, "application/vnd.github+json")
                .header("X-GitHub-Api-Version", API_VERSION);
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!("{} {}", method, url);
            let response = request.send().await?;

            let now = chrono::Utc::now().timestamp().max(0) as u64;
            match classify_rate_limit(response.status(), response.headers(), now) {
                RateLimit::Primary(wait) if !retried => {
                    warn!("Request quota exhausted for request {} {}", method, url);
                    info!("Retrying after {} seconds!", wait.as_secs());
                    tokio::time::sleep(wait).await;
                    retried = true;
                }
                RateLimit::Secondary => {
                    warn!("Abuse detected for request {} {}", method, url);
                    return Ok(response);
                }
                _ => return Ok(response),
            }
        }
    }

    /// Send and turn any non-success status into an error
    async fn send_checked(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> AppResult<Response> {
        let response = self.send(method.clone(), url, body).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(AppError::from_status(status, format!("{} {}: {}", method, url, message)))
    }
}

#[async_trait]
impl RepoClient for GitHubClient {
    async fn list_org_repositories(&self, org: &str) -> AppResult<Vec<Repository>> {
        let mut repos = Vec::new();
        let mut next = Some(self.url(&format!(
            "/orgs/{}/repos?type=all&per_page={}",
            org, self.config.per_page
        )));

        while let Some(url) = next {
            let response = self.send_checked(Method::GET, &url, None).await?;
            next = next_page_link(response.headers());
            let page: Vec<Repository> = response.json().await?;
            repos.extend(page);
        }

        Ok(repos)
    }

    async fn get_branch_protection(&self, org: &str, repo: &str, branch: &str) -> AppResult<SettingsNode> {
        let url = self.url(&format!("/repos/{}/{}/branches/{}/protection", org, repo, branch));
        let response = self.send_checked(Method::GET, &url, None).await?;
        let value: serde_json::Value = response.json().await?;
        Ok(SettingsNode::from(value))
    }

    async fn update_branch_protection(
        &self,
        org: &str,
        repo: &str,
        branch: &str,
        settings: &SettingsNode,
    ) -> AppResult<()> {
        let url = self.url(&format!("/repos/{}/{}/branches/{}/protection", org, repo, branch));
        let body = serde_json::Value::from(settings.clone());
        self.send_checked(Method::PUT, &url, Some(&body)).await?;
        Ok(())
    }

    async fn vulnerability_alerts_status(&self, org: &str, repo: &str) -> AppResult<u16> {
        let url = self.url(&format!("/repos/{}/{}/vulnerability-alerts", org, repo));
        let response = self.send_checked(Method::GET, &url, None).await?;
        Ok(response.status().as_u16())
    }

    async fn enable_vulnerability_alerts(&self, org: &str, repo: &str) -> AppResult<bool> {
        let url = self.url(&format!("/repos/{}/{}/vulnerability-alerts", org, repo));
        let response = self.send_checked(Method::PUT, &url, None).await?;
        Ok(response.status() == StatusCode::NO_CONTENT)
    }

    async fn get_file_contents(&self, org: &str, repo: &str, path: &str) -> AppResult<String> {
        let url = self.url(&format!("/repos/{}/{}/contents/{}", org, repo, path));
        let response = self.send_checked(Method::GET, &url, None).await?;
        let payload: ContentResponse = response.json().await?;
        decode_content(payload)
    }
}
