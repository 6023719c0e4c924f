//! Error types and handling
//!
//! This module provides the error taxonomy for the session/organization core.
//! Business-flow operations return structured results built from these types;
//! callers never see panics or uncaught transport errors.

use thiserror::Error;

/// Core error types
#[derive(Debug, Error)]
pub enum CoreError {
    /// Missing, expired or rejected credential (401-equivalent)
    #[error("Credential error: {0}")]
    Credential(String),

    /// Input rejected before any network call (slug format, hierarchy rule)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource already exists; carries a suggested alternative slug which
    /// is offered to the caller, never applied automatically
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        suggested_slug: Option<String>,
    },

    /// Authenticated but not allowed (403-equivalent); distinct from
    /// `Credential` so callers do not advise re-authentication for an
    /// authorization denial
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Transport-level failure (connect, DNS, malformed response)
    #[error("Network error: {0}")]
    Network(String),

    /// Request timed out or was cancelled; distinct from `Network` so
    /// callers can offer "retry" instead of "sign in again"
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Organization or location absent for the given id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local persistence failure (selection store)
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// Stable identifier for programmatic handling by callers
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Credential(_) => "credential",
            CoreError::Validation(_) => "validation",
            CoreError::Conflict { .. } => "conflict",
            CoreError::Forbidden(_) => "forbidden",
            CoreError::Network(_) => "network",
            CoreError::Timeout(_) => "timeout",
            CoreError::NotFound(_) => "not_found",
            CoreError::Config(_) => "config",
            CoreError::Storage(_) => "storage",
        }
    }

    /// True when the failure should force a local sign-out
    pub fn is_credential(&self) -> bool {
        matches!(self, CoreError::Credential(_))
    }
}

// Implement From for common error types

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CoreError::Timeout("backend request timed out".to_string())
        } else if err.is_connect() {
            CoreError::Network("failed to connect to backend".to_string())
        } else {
            CoreError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Network(format!("malformed backend response: {}", err))
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        CoreError::Validation(err.to_string())
    }
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
