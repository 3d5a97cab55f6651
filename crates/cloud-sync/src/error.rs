//! Error types for the shared-document sync crate.

use thiserror::Error;

/// Result type alias for cloud sync operations.
pub type Result<T> = std::result::Result<T, CloudSyncError>;

/// Errors that can occur while talking to the hosted shared document.
#[derive(Debug, Error)]
pub enum CloudSyncError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API error response from the document host
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Sync is not configured (missing or placeholder credentials)
    #[error("Cloud sync is not configured: {0}")]
    Config(String),
}

impl CloudSyncError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_exposes_status_code() {
        let err = CloudSyncError::api(401, "bad key");
        assert_eq!(err.status_code(), Some(401));
        assert_eq!(err.to_string(), "API error (401): bad key");
    }

    #[test]
    fn config_error_has_no_status() {
        let err = CloudSyncError::config("placeholder API key");
        assert_eq!(err.status_code(), None);
    }
}
