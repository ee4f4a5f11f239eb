//! Storage error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during checkpoint and document storage
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid checkpoint: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Checkpoint not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Problems found while normalizing a checkpoint read from disk
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Invalid {field} timestamp '{value}'")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("Unknown detail status '{status}' for job '{job_id}'")]
    UnknownStatus { job_id: String, status: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
