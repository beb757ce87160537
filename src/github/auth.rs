//! Platform authentication
//!
//! Personal access tokens are used as-is. GitHub App credentials are turned
//! into a short-lived installation token: sign an RS256 JWT as the app, then
//! exchange it for an installation access token, cached until shortly before
//! it expires.

use crate::error::{AppError, AppResult};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

/// Backdate `iat` to tolerate clock drift (platform recommendation)
const APP_JWT_BACKDATE_SECONDS: i64 = 60;

/// App JWT lifetime; the platform rejects anything over 10 minutes
const APP_JWT_EXPIRATION_MINUTES: i64 = 9;

/// Refresh installation tokens this long before they expire
const TOKEN_REFRESH_MARGIN_SECONDS: i64 = 60;

/// How the client authenticates against the platform
#[derive(Clone)]
pub enum Credentials {
    /// Personal access or fine-grained token
    Token(String),
    /// GitHub App installation
    App {
        app_id: u64,
        private_key: String,
        installation_id: u64,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Token(_) => write!(f, "Token(****)"),
            Credentials::App { app_id, installation_id, .. } => {
                write!(f, "App {{ app_id: {}, installation_id: {} }}", app_id, installation_id)
            }
        }
    }
}

/// JWT claims for authenticating as the app itself
#[derive(Debug, Serialize, Deserialize)]
pub struct AppClaims {
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer (app ID)
    pub iss: String,
}

/// Sign a JWT identifying the app
pub fn create_app_jwt(app_id: u64, private_key: &str) -> AppResult<String> {
    let now = Utc::now();
    let claims = AppClaims {
        iat: (now - Duration::seconds(APP_JWT_BACKDATE_SECONDS)).timestamp(),
        exp: (now + Duration::minutes(APP_JWT_EXPIRATION_MINUTES)).timestamp(),
        iss: app_id.to_string(),
    };

    let key = EncodingKey::from_rsa_pem(private_key.as_bytes())
        .map_err(|e| AppError::Auth(format!("Invalid app private key: {}", e)))?;

    encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(|e| AppError::Auth(format!("Failed to sign app JWT: {}", e)))
}

/// Installation access token response
#[derive(Debug, Clone, Deserialize)]
pub struct InstallationToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl InstallationToken {
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECONDS) >= self.expires_at
    }
}

/// Hands out a valid bearer token for every request
pub struct TokenProvider {
    credentials: Credentials,
    cached: RwLock<Option<InstallationToken>>,
}

impl TokenProvider {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            cached: RwLock::new(None),
        }
    }

    /// Current bearer token, exchanging app credentials when needed
    pub async fn token(&self, http: &reqwest::Client, api_base: &str) -> AppResult<String> {
        let (app_id, private_key, installation_id) = match &self.credentials {
            Credentials::Token(token) => return Ok(token.clone()),
            Credentials::App { app_id, private_key, installation_id } => {
                (*app_id, private_key, *installation_id)
            }
        };

        if let Some(cached) = self.cached.read().await.as_ref() {
            if !cached.needs_refresh(Utc::now()) {
                return Ok(cached.token.clone());
            }
        }

        let mut cached = self.cached.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(existing) = cached.as_ref() {
            if !existing.needs_refresh(Utc::now()) {
                return Ok(existing.token.clone());
            }
        }

        let jwt = create_app_jwt(app_id, private_key)?;
        let url = format!("{}/app/installations/{}/access_tokens", api_base, installation_id);
        let response = http
            .post(&url)
            .bearer_auth(jwt)
            .header(reqwest::header::USER_AGENT, "repo-standard")
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Auth(format!(
                "Installation token exchange failed ({}): {}",
                status, body
            )));
        }

        let token: InstallationToken = response.json().await?;
        debug!("Obtained installation token expiring at {}", token.expires_at);
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }
}
