//! Error types for FlatStore
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using FlatError
pub type Result<T> = std::result::Result<T, FlatError>;

/// Unified error type for FlatStore operations
#[derive(Debug, Error)]
pub enum FlatError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    /// Malformed file contents, or a stored value that does not fit the
    /// requested shape
    #[error("Decode error: {0}")]
    Decode(#[source] serde_json::Error),

    /// A value that cannot be represented as JSON
    #[error("Encode error: {0}")]
    Encode(#[source] serde_json::Error),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FlatError {
    /// True for `KeyNotFound`, whatever the key
    pub fn is_not_found(&self) -> bool {
        matches!(self, FlatError::KeyNotFound(_))
    }
}
