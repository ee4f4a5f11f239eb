//! Checkpoint persistence
//!
//! Every save writes two files into the checkpoint directory:
//! - `checkpoint_<YYYYmmdd_HHMMSS_mmm>_<phase>_<batch>.json`, never overwritten
//! - `checkpoint_latest.json`, replaced atomically through a temp file and rename

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::schema::CheckpointFile;
use crate::storage::snapshot::CheckpointSnapshot;
use chrono::Local;
use std::path::{Path, PathBuf};

pub const LATEST_FILE: &str = "checkpoint_latest.json";
const LATEST_TEMP_FILE: &str = ".checkpoint_latest.json.tmp";

/// Files written by one successful save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedCheckpoint {
    pub record: PathBuf,
    pub latest: PathBuf,
}

/// Reads and writes crawl snapshots in a directory
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn latest_path(&self) -> PathBuf {
        self.dir.join(LATEST_FILE)
    }

    /// Writes the snapshot as a timestamped record and as the latest record
    pub fn save(&self, snapshot: &CheckpointSnapshot) -> StorageResult<SavedCheckpoint> {
        std::fs::create_dir_all(&self.dir)?;

        let json = serde_json::to_string_pretty(&CheckpointFile::from(snapshot))?;

        let stem = format!(
            "checkpoint_{}_{}_{}",
            Local::now().format("%Y%m%d_%H%M%S_%3f"),
            snapshot.phase,
            snapshot.batch_number
        );
        let mut record = self.dir.join(format!("{}.json", stem));
        let mut suffix = 1;
        while record.exists() {
            record = self.dir.join(format!("{}_{}.json", stem, suffix));
            suffix += 1;
        }
        std::fs::write(&record, &json)?;

        let temp = self.dir.join(LATEST_TEMP_FILE);
        let latest = self.latest_path();
        std::fs::write(&temp, &json)?;
        std::fs::rename(&temp, &latest)?;

        tracing::info!(
            "Checkpoint saved: {} ({} jobs, {} processed, batch {})",
            record.display(),
            snapshot.statistics.total_collected,
            snapshot.statistics.details_fetched,
            snapshot.batch_number
        );

        Ok(SavedCheckpoint { record, latest })
    }

    /// Saves, logging instead of failing
    ///
    /// Returns false when the write failed. The crawl carries on either way.
    pub fn save_or_warn(&self, snapshot: &CheckpointSnapshot) -> bool {
        match self.save(snapshot) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Failed to write checkpoint to {}: {}", self.dir.display(), e);
                false
            }
        }
    }

    /// Loads a snapshot, from `path` or from the latest record
    pub fn try_load(&self, path: Option<&Path>) -> StorageResult<CheckpointSnapshot> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.latest_path());

        if !path.exists() {
            return Err(StorageError::NotFound(path));
        }

        let content = std::fs::read_to_string(&path)?;
        let file: CheckpointFile = serde_json::from_str(&content)?;
        Ok(file.into_snapshot()?)
    }

    /// Loads a snapshot, degrading a missing or corrupt file to `None`
    pub fn load(&self, path: Option<&Path>) -> Option<CheckpointSnapshot> {
        match self.try_load(path) {
            Ok(snapshot) => {
                tracing::info!(
                    "Loaded checkpoint from {} (phase {}, batch {}, {} jobs)",
                    snapshot.timestamp,
                    snapshot.phase,
                    snapshot.batch_number,
                    snapshot.jobs.len()
                );
                Some(snapshot)
            }
            Err(StorageError::NotFound(path)) => {
                tracing::warn!("No checkpoint found at {}", path.display());
                None
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable checkpoint: {}", e);
                None
            }
        }
    }
}
