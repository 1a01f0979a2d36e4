//! Oracle client error types.

use thiserror::Error;

/// Result type for oracle operations.
pub type OracleResult<T> = Result<T, OracleError>;

/// Errors that can occur while talking to the video oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Oracle API returned {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("No content in oracle response")]
    EmptyResponse,

    #[error("All oracle models failed")]
    AllModelsFailed,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OracleError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Check if the error is worth retrying on another model.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OracleError::Network(_) | OracleError::ApiError { .. } | OracleError::EmptyResponse
        )
    }
}
