//! Credential store error types

use thiserror::Error;

/// Result type for credential store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Credential store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem access failed
    #[error("credential store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored credentials could not be serialized
    #[error("credential store encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// No user config directory is available for the default store path
    #[error("no config directory available for the credentials file")]
    NoConfigDir,
}
