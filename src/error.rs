//! Error handling module
//!
//! Provides unified error types and handling for the entire application.

use reqwest::StatusCode;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Remote API error ({status}): {message}")]
    Remote { status: StatusCode, message: String },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Policy error: {0}")]
    Policy(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// "Resource does not exist" on the remote platform.
    ///
    /// This is the benign signal for an absent Jenkinsfile, an unprotected
    /// branch or disabled vulnerability alerts.
    pub fn is_not_found(&self) -> bool {
        match self {
            AppError::NotFound(_) => true,
            AppError::Remote { status, .. } => *status == StatusCode::NOT_FOUND,
            AppError::Http(e) => e.status() == Some(StatusCode::NOT_FOUND),
            _ => false,
        }
    }

    /// Build an error from a non-success HTTP response
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == StatusCode::NOT_FOUND {
            not_found_error(message)
        } else {
            AppError::Remote { status, message }
        }
    }
}

/// Result type alias used across the crate
pub type AppResult<T> = Result<T, AppError>;

/// Helper function to create a configuration error
pub fn config_error(msg: impl Into<String>) -> AppError {
    AppError::Config(msg.into())
}

/// Helper function to create a not found error
pub fn not_found_error(msg: impl Into<String>) -> AppError {
    AppError::NotFound(msg.into())
}
