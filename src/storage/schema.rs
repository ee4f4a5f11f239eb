//! On-disk checkpoint format
//!
//! The JSON layout is kept separate from the in-memory snapshot so that
//! files written by older runs, or edited by hand, are normalized in one
//! place when read back:
//! - Identifiers are trimmed; blank identifiers are dropped
//! - Duplicate identifiers are dropped, keeping the first occurrence
//! - A job carrying a detail record is always processed
//! - A failed detail without a reason counts as a navigation error
//! - Statistics are recomputed from the job list

use crate::state::{
    DetailRecord, DetailStatus, FailureReason, JobSummary, Phase, TrackedJob, UNKNOWN_FIELD,
};
use crate::storage::error::SnapshotError;
use crate::storage::snapshot::{CheckpointSnapshot, Statistics};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

const STATUS_SAVED: &str = "saved";
const STATUS_FAILED: &str = "failed";

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckpointFile {
    pub timestamp: String,
    pub current_phase: Phase,
    #[serde(default)]
    pub batch_number: u64,
    #[serde(default)]
    pub statistics: StatisticsEntry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
    #[serde(default)]
    pub jobs: Vec<JobEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StatisticsEntry {
    #[serde(default)]
    pub total_ids_collected: usize,
    #[serde(default)]
    pub details_fetched: usize,
    #[serde(default)]
    pub remaining_jobs: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobEntry {
    pub id: String,
    #[serde(default = "unknown")]
    pub organization: String,
    #[serde(default = "unknown")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_at: Option<String>,
    #[serde(default)]
    pub processed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<DetailEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DetailEntry {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<FailureReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn unknown() -> String {
    UNKNOWN_FIELD.to_string()
}

fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses RFC 3339, or a naive ISO timestamp taken as UTC
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

impl From<&CheckpointSnapshot> for CheckpointFile {
    fn from(snapshot: &CheckpointSnapshot) -> Self {
        Self {
            timestamp: format_timestamp(&snapshot.timestamp),
            current_phase: snapshot.phase,
            batch_number: snapshot.batch_number,
            statistics: StatisticsEntry {
                total_ids_collected: snapshot.statistics.total_collected,
                details_fetched: snapshot.statistics.details_fetched,
                remaining_jobs: snapshot.statistics.remaining,
            },
            config_hash: snapshot.config_hash.clone(),
            jobs: snapshot.jobs.iter().map(JobEntry::from).collect(),
        }
    }
}

impl From<&TrackedJob> for JobEntry {
    fn from(job: &TrackedJob) -> Self {
        Self {
            id: job.summary.id.clone(),
            organization: job.summary.organization.clone(),
            title: job.summary.title.clone(),
            url: job.summary.url.clone(),
            collected_at: job.summary.collected_at.as_ref().map(format_timestamp),
            processed: job.summary.processed,
            detail: job.detail.as_ref().map(DetailEntry::from),
        }
    }
}

impl From<&DetailRecord> for DetailEntry {
    fn from(record: &DetailRecord) -> Self {
        let path = |p: &PathBuf| p.to_string_lossy().into_owned();
        let saved_at = Some(format_timestamp(&record.saved_at));

        match &record.status {
            DetailStatus::Saved {
                document,
                screenshot,
            } => Self {
                status: STATUS_SAVED.to_string(),
                saved_at,
                file: document.as_ref().map(path),
                screenshot: screenshot.as_ref().map(path),
                failure_reason: None,
                message: None,
            },
            DetailStatus::Failed { reason, message } => Self {
                status: STATUS_FAILED.to_string(),
                saved_at,
                file: None,
                screenshot: None,
                failure_reason: Some(*reason),
                message: Some(message.clone()),
            },
        }
    }
}

impl CheckpointFile {
    /// Validates and normalizes the file into a snapshot
    pub fn into_snapshot(self) -> Result<CheckpointSnapshot, SnapshotError> {
        let timestamp =
            parse_timestamp(&self.timestamp).ok_or_else(|| SnapshotError::InvalidTimestamp {
                field: "timestamp",
                value: self.timestamp.clone(),
            })?;

        let mut seen = HashSet::new();
        let mut jobs = Vec::with_capacity(self.jobs.len());

        for entry in self.jobs {
            let id = entry.id.trim().to_string();
            if id.is_empty() {
                tracing::warn!("Dropping checkpoint job with blank identifier");
                continue;
            }
            if !seen.insert(id.clone()) {
                tracing::warn!("Dropping duplicate checkpoint job '{}'", id);
                continue;
            }

            let detail = entry
                .detail
                .map(|detail| detail.into_record(&id, timestamp))
                .transpose()?;

            let collected_at = entry.collected_at.as_deref().and_then(|value| {
                let parsed = parse_timestamp(value);
                if parsed.is_none() {
                    tracing::warn!("Ignoring unparsable collected_at '{}' for job '{}'", value, id);
                }
                parsed
            });

            let summary = JobSummary {
                processed: entry.processed || detail.is_some(),
                id,
                organization: entry.organization,
                title: entry.title,
                url: entry.url.filter(|url| !url.trim().is_empty()),
                collected_at,
            };

            jobs.push(TrackedJob { summary, detail });
        }

        let statistics = Statistics::from_jobs(&jobs);
        if statistics.total_collected != self.statistics.total_ids_collected
            || statistics.details_fetched != self.statistics.details_fetched
        {
            tracing::debug!(
                "Recomputed checkpoint statistics ({} collected, {} fetched) differ from stored ({}, {})",
                statistics.total_collected,
                statistics.details_fetched,
                self.statistics.total_ids_collected,
                self.statistics.details_fetched
            );
        }

        Ok(CheckpointSnapshot {
            timestamp,
            phase: self.current_phase,
            batch_number: self.batch_number,
            statistics,
            config_hash: self.config_hash.filter(|hash| !hash.is_empty()),
            jobs,
        })
    }
}

impl DetailEntry {
    fn into_record(
        self,
        job_id: &str,
        fallback_time: DateTime<Utc>,
    ) -> Result<DetailRecord, SnapshotError> {
        let saved_at = self
            .saved_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(fallback_time);

        let status = match self.status.trim().to_ascii_lowercase().as_str() {
            STATUS_SAVED => DetailStatus::Saved {
                document: self.file.map(PathBuf::from),
                screenshot: self.screenshot.map(PathBuf::from),
            },
            STATUS_FAILED => DetailStatus::Failed {
                reason: self.failure_reason.unwrap_or(FailureReason::NavigationError),
                message: self.message.unwrap_or_default(),
            },
            _ => {
                return Err(SnapshotError::UnknownStatus {
                    job_id: job_id.to_string(),
                    status: self.status,
                })
            }
        };

        Ok(DetailRecord {
            job_id: job_id.to_string(),
            saved_at,
            status,
        })
    }
}
