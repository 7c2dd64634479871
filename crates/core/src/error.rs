// Central Error Type for the Scheduling Core

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Transient I/O failure talking to a repository or store
    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Slot already held: {slot_key}")]
    SlotAlreadyHeld { slot_key: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Hold expired: {0}")]
    HoldExpired(String),

    /// Per-recipient delivery failure
    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Timed out after {timeout_ms}ms: {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors worth retrying on the next tick (I/O and timeouts)
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Repository(_) | AppError::Timeout { .. })
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Adapters convert their driver errors through a helper (orphan rule),
// e.g. infra-sqlite maps sqlx::Error into AppError::Repository.
