//! Storage module for persisting crawl progress
//!
//! This module handles everything the crawler writes to disk:
//! - Checkpoint snapshots (timestamped records plus an atomically replaced latest)
//! - Validation and normalization of checkpoints read back for resume
//! - The detail sink for extracted documents and screenshots

mod checkpoint;
mod error;
mod schema;
mod sink;
mod snapshot;

pub use checkpoint::{CheckpointStore, SavedCheckpoint, LATEST_FILE};
pub use error::{SnapshotError, StorageError, StorageResult};
pub use sink::DetailSink;
pub use snapshot::{CheckpointSnapshot, Statistics};
