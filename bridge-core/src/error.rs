//! Error types for roster-bridge.

use crate::transport::TransportError;

/// Main error type for bridge operations.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Transport error talking to the chat backend.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A response payload did not match the expected endpoint shape.
    #[error("response decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// An externally triggered operation was given an invalid parameter.
    #[error("invalid parameter: {reason}")]
    InvalidParameter {
        /// Why the parameter was rejected.
        reason: String,
    },

    /// A referenced roster record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Record kind (course, group, user, enrolment).
        kind: &'static str,
        /// The id that was looked up.
        id: i64,
    },
}

/// Storage layer errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database path error.
    #[error("invalid database path: {path}")]
    InvalidPath {
        /// The invalid path.
        path: std::path::PathBuf,
    },
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
