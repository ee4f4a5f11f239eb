//! Extraction summary report
//!
//! Written after every extraction phase as
//! `job_extraction_summary_<YYYYmmdd_HHMMSS>.json`.

use crate::state::{DetailStatus, FailureReason, TrackedJob};
use chrono::{Local, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

#[derive(Debug, Serialize)]
pub struct ExtractionSummary {
    pub total_jobs: usize,
    pub successful: usize,
    pub failed: usize,
    pub extraction_date: String,
    pub jobs: Vec<SummaryEntry>,
}

#[derive(Debug, Serialize)]
pub struct SummaryEntry {
    pub id: String,
    pub organization: String,
    pub title: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<FailureReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExtractionSummary {
    /// Summary over every job that has an extraction outcome
    pub fn from_jobs(jobs: &[TrackedJob]) -> Self {
        let entries: Vec<SummaryEntry> = jobs
            .iter()
            .filter_map(|job| {
                let detail = job.detail.as_ref()?;
                let (status, file, failure_reason, message) = match &detail.status {
                    DetailStatus::Saved { document, .. } => (
                        "saved",
                        document
                            .as_ref()
                            .map(|path| path.to_string_lossy().into_owned()),
                        None,
                        None,
                    ),
                    DetailStatus::Failed { reason, message } => {
                        ("failed", None, Some(*reason), Some(message.clone()))
                    }
                };

                Some(SummaryEntry {
                    id: job.summary.id.clone(),
                    organization: job.summary.organization.clone(),
                    title: job.summary.title.clone(),
                    status,
                    file,
                    failure_reason,
                    message,
                })
            })
            .collect();

        let successful = entries.iter().filter(|e| e.status == "saved").count();

        Self {
            total_jobs: entries.len(),
            successful,
            failed: entries.len() - successful,
            extraction_date: Utc::now().to_rfc3339(),
            jobs: entries,
        }
    }
}

/// Writes the extraction summary into `dir`
pub fn write_extraction_summary(dir: &Path, jobs: &[TrackedJob]) -> OutputResult<PathBuf> {
    let summary = ExtractionSummary::from_jobs(jobs);

    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "job_extraction_summary_{}.json",
        Local::now().format("%Y%m%d_%H%M%S")
    ));
    std::fs::write(&path, serde_json::to_string_pretty(&summary)?)?;

    tracing::info!(
        "Extraction summary: {} successful, {} failed ({})",
        summary.successful,
        summary.failed,
        path.display()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{DetailRecord, JobSummary};
    use tempfile::TempDir;

    #[test]
    fn test_summary_counts_only_attempted_jobs() {
        let mut saved = TrackedJob::new(JobSummary::new("1", "Org", "A"));
        saved.detail = Some(DetailRecord::saved("1", PathBuf::from("job_1.html"), None));
        let mut failed = TrackedJob::new(JobSummary::new("2", "Org", "B"));
        failed.detail = Some(DetailRecord::failed("2", FailureReason::Timeout, "slow"));
        let pending = TrackedJob::new(JobSummary::new("3", "Org", "C"));

        let dir = TempDir::new().unwrap();
        let path = write_extraction_summary(dir.path(), &[saved, failed, pending]).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["total_jobs"], 2);
        assert_eq!(written["successful"], 1);
        assert_eq!(written["failed"], 1);
        assert_eq!(written["jobs"][0]["file"], "job_1.html");
        assert_eq!(written["jobs"][1]["failure_reason"], "timeout");
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("job_extraction_summary_"));
    }
}
