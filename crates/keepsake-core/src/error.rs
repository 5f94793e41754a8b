//! Error types for keepsake-core

use thiserror::Error;

use crate::sync::RemoteError;

/// Result type alias using keepsake-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in keepsake-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Daily capture limit reached
    #[error("Daily limit reached: {0}")]
    DailyLimit(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote backend error
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// A full reconciliation pass is already running
    #[error("Sync already in progress")]
    SyncInProgress,
}
