use crate::storage::error::StorageResult;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// Writes extracted detail documents to a directory
#[derive(Debug, Clone)]
pub struct DetailSink {
    dir: PathBuf,
}

/// Identifier reduced to characters safe in a file name
fn file_safe(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl DetailSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Saves the document as `job_<id>_<YYYYmmdd_HHMMSS>.html`
    pub fn save_document(
        &self,
        job_id: &str,
        content: &str,
        at: DateTime<Local>,
    ) -> StorageResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!(
            "job_{}_{}.html",
            file_safe(job_id),
            at.format("%Y%m%d_%H%M%S")
        ));
        std::fs::write(&path, content)?;
        tracing::debug!("Saved detail document {}", path.display());
        Ok(path)
    }

    /// Path for the screenshot accompanying a document
    pub fn screenshot_path(&self, job_id: &str, at: DateTime<Local>) -> PathBuf {
        self.dir.join(format!(
            "job_{}_screenshot_{}.png",
            file_safe(job_id),
            at.format("%Y%m%d_%H%M%S")
        ))
    }
}
