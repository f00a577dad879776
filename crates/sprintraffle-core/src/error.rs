//! Core error types for sprintraffle-core.
//!
//! The sprint clock, store and ledger never produce errors of their own; every
//! variant here originates at a boundary (HTTP, SQLite, config file, input
//! validation) and ends up in front of the user as a single [`Alert`].

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::locale::Locale;

/// Core error type for sprintraffle-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend API errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Ad view was refused before or after reaching the server
    #[error("Ad view rejected: {0}")]
    AdView(#[from] AdViewError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("unknown config key: {0}")]
    UnknownKey(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Errors raised by the HTTP collaborator.
///
/// None of these are retried, apart from the single token refresh on 401.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response. `message` is the server's `message` field when present.
    #[error("HTTP {status}{}", status_suffix(.message))]
    Status { status: u16, message: Option<String> },

    #[error("Session expired, please sign in again")]
    Unauthorized,

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

/// Reasons an ad view does not turn into a ticket.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdViewError {
    #[error("No sprint is active right now")]
    SprintNotActive,

    #[error("Ad must be watched for at least {min_secs} seconds (watched {watched_secs})")]
    TooShort { watched_secs: u64, min_secs: u64 },

    #[error("Ad view limit of {max} per sprint reached")]
    LimitReached { max: u32 },

    #[error("Ad view {request_id} was already submitted")]
    Duplicate { request_id: Uuid },
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid time range: end ({end}) must be greater than start ({start})")]
    InvalidTimeRange {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

fn status_suffix(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) if e.code == rusqlite::ErrorCode::DatabaseLocked => {
                DatabaseError::Locked
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Malformed(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// The generic error dialog: a title, a message and one acknowledgement control.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Alert {
    pub title: String,
    pub message: String,
    pub dismiss: String,
}

impl CoreError {
    /// Build the alert shown to the user for this error.
    ///
    /// Server-provided messages are shown verbatim; anything else falls back to
    /// the error's own description, or the localized generic text if that is empty.
    pub fn alert(&self, locale: Locale) -> Alert {
        let message = match self {
            CoreError::Api(ApiError::Status {
                message: Some(m), ..
            }) => m.clone(),
            other => other.to_string(),
        };
        let message = if message.trim().is_empty() {
            locale.generic_error().to_string()
        } else {
            message
        };
        Alert {
            title: locale.error_title().to_string(),
            message,
            dismiss: locale.dismiss_label().to_string(),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_prefers_server_message() {
        let err = CoreError::Api(ApiError::Status {
            status: 400,
            message: Some("Sprint bulunamadı".into()),
        });
        let alert = err.alert(Locale::Tr);
        assert_eq!(alert.title, "Hata");
        assert_eq!(alert.message, "Sprint bulunamadı");
        assert_eq!(alert.dismiss, "Tamam");
    }

    #[test]
    fn alert_falls_back_to_error_text() {
        let err = CoreError::Api(ApiError::Timeout);
        let alert = err.alert(Locale::En);
        assert_eq!(alert.title, "Error");
        assert!(alert.message.contains("API error"));
        assert_eq!(alert.dismiss, "OK");
    }

    #[test]
    fn alert_uses_generic_text_for_empty_message() {
        let err = CoreError::Custom("  ".into());
        let alert = err.alert(Locale::En);
        assert_eq!(alert.message, "Something went wrong. Please try again.");
    }

    #[test]
    fn status_display_includes_message_when_present() {
        let with = ApiError::Status { status: 503, message: Some("down".into()) };
        let without = ApiError::Status { status: 503, message: None };
        assert_eq!(with.to_string(), "HTTP 503: down");
        assert_eq!(without.to_string(), "HTTP 503");
    }
}
