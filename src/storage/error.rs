//! Storage-specific error types

use std::fmt;

/// Storage operation errors
#[derive(Debug)]
pub enum StorageError {
    /// Filesystem failures (permissions, disk full, missing directory)
    Io(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Backend refused the write (quota or capacity reached)
    QuotaExceeded(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(msg) => write!(f, "Storage IO error: {}", msg),
            StorageError::Serialization(msg) => write!(f, "Storage serialization error: {}", msg),
            StorageError::QuotaExceeded(msg) => write!(f, "Storage quota exceeded: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
