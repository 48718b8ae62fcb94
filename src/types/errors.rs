//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context. This is the internal error channel;
//! the protocol boundary converts every variant into a `Diagnostic` payload.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the rechenwerk core.
#[derive(Error, Debug)]
pub enum Error {
    /// Validation errors (missing/empty/ill-typed arguments).
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found (unknown tool name).
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate-limit window exhausted.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Whitelist gate violated (execute before details).
    #[error("security violation: {0}")]
    Security(String),

    /// A parameter value lacks a unit, or the unit is unknown/incompatible.
    #[error("units error: {0}")]
    Units(String),

    /// A formula handler failed (non-positive divisor, unsolvable
    /// configuration, wrong number of knowns).
    #[error("computation error: {0}")]
    Computation(String),

    /// Internal errors.
    #[error("internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// Convenience constructors
impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn quota_exceeded(msg: impl Into<String>) -> Self {
        Self::QuotaExceeded(msg.into())
    }

    pub fn security(msg: impl Into<String>) -> Self {
        Self::Security(msg.into())
    }

    pub fn units(msg: impl Into<String>) -> Self {
        Self::Units(msg.into())
    }

    pub fn computation(msg: impl Into<String>) -> Self {
        Self::Computation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
