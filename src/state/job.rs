/// Listing and detail records tracked across a run
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Organization or title placeholder when a row does not expose one
pub const UNKNOWN_FIELD: &str = "Unknown";

/// One listing row as read from the listing view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub id: String,
    pub organization: String,
    pub title: String,
    /// Detail link exposed by the row, if any
    pub url: Option<String>,
    pub collected_at: Option<DateTime<Utc>>,
    /// Set once extraction was attempted, successful or not
    pub processed: bool,
}

impl JobSummary {
    pub fn new(id: impl Into<String>, organization: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            organization: organization.into(),
            title: title.into(),
            url: None,
            collected_at: Some(Utc::now()),
            processed: false,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Why a detail extraction failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The listing row or its detail view could not be located
    NotFound,

    /// The detail view loaded but no content strategy produced text
    EmptyContent,

    /// Navigation to or from the detail view failed
    NavigationError,

    /// A bounded wait ran out
    Timeout,

    /// The document could not be written to the detail sink
    SinkWrite,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::EmptyContent => "empty_content",
            Self::NavigationError => "navigation_error",
            Self::Timeout => "timeout",
            Self::SinkWrite => "sink_write",
        }
    }

    pub fn all() -> [Self; 5] {
        [
            Self::NotFound,
            Self::EmptyContent,
            Self::NavigationError,
            Self::Timeout,
            Self::SinkWrite,
        ]
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one extraction attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailStatus {
    Saved {
        document: Option<PathBuf>,
        screenshot: Option<PathBuf>,
    },
    Failed {
        reason: FailureReason,
        message: String,
    },
}

/// Detail extraction record for a collected listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRecord {
    pub job_id: String,
    pub saved_at: DateTime<Utc>,
    pub status: DetailStatus,
}

impl DetailRecord {
    pub fn saved(job_id: &str, document: PathBuf, screenshot: Option<PathBuf>) -> Self {
        Self {
            job_id: job_id.to_string(),
            saved_at: Utc::now(),
            status: DetailStatus::Saved {
                document: Some(document),
                screenshot,
            },
        }
    }

    pub fn failed(job_id: &str, reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            job_id: job_id.to_string(),
            saved_at: Utc::now(),
            status: DetailStatus::Failed {
                reason,
                message: message.into(),
            },
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self.status, DetailStatus::Saved { .. })
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match &self.status {
            DetailStatus::Failed { reason, .. } => Some(*reason),
            DetailStatus::Saved { .. } => None,
        }
    }
}

/// A collected listing together with its extraction outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedJob {
    pub summary: JobSummary,
    pub detail: Option<DetailRecord>,
}

impl TrackedJob {
    pub fn new(summary: JobSummary) -> Self {
        Self {
            summary,
            detail: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.summary.id
    }

    pub fn is_failed(&self) -> bool {
        self.detail
            .as_ref()
            .map(|detail| !detail.is_saved())
            .unwrap_or(false)
    }
}
