//! Error types for the Banter domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Banter operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Request validation ---
    #[error("{0}")]
    Validation(String),

    // --- External chat engine ---
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    // --- Session store ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a missing or malformed request field.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the caller can fix this by correcting the request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by engine (status: 429)")]
    RateLimited,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Engine not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid engine response: {0}")]
    InvalidResponse(String),
}

impl EngineError {
    /// HTTP status reported by the engine, when it answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { status_code, .. } => Some(*status_code),
            Self::RateLimited => Some(429),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}
