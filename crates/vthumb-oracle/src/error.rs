//! Oracle client error types.

use thiserror::Error;

pub type OracleResult<T> = Result<T, OracleError>;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Oracle not configured: {0}")]
    NotConfigured(String),

    #[error("Circuit open, skipping oracle call")]
    CircuitOpen,

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Score out of range: {0}")]
    OutOfRange(f64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OracleError {
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Whether the failure says something about the backend's health.
    ///
    /// A well-formed reply carrying a bad score does not trip the breaker.
    pub fn counts_against_breaker(&self) -> bool {
        matches!(
            self,
            OracleError::RequestFailed(_) | OracleError::Network(_)
        )
    }
}
