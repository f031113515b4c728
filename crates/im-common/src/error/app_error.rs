//! Application error types
//!
//! Unified error handling for process-level failures (configuration,
//! dependencies, auth). Per-request protocol failures are status codes on
//! response frames, not `AppError`s.

use im_core::DomainError;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    // Redis errors
    #[error("Cache error: {0}")]
    Cache(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Server lifecycle errors
    #[error("Server error: {0}")]
    Server(String),

    // Internal errors
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl AppError {
    /// Whether the token was rejected (invalid or expired).
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::InvalidToken | Self::TokenExpired)
    }
}

/// Result alias for application operations
pub type AppResult<T> = Result<T, AppError>;
