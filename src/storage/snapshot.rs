use crate::state::{FailureReason, Phase, TrackedJob};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Progress counters stored with every checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Statistics {
    pub total_collected: usize,
    /// Processed jobs, saved or failed
    pub details_fetched: usize,
    pub remaining: usize,
}

impl Statistics {
    pub fn from_jobs(jobs: &[TrackedJob]) -> Self {
        let total_collected = jobs.len();
        let details_fetched = jobs.iter().filter(|job| job.summary.processed).count();
        Self {
            total_collected,
            details_fetched,
            remaining: total_collected - details_fetched,
        }
    }
}

/// Everything needed to resume a run
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointSnapshot {
    pub timestamp: DateTime<Utc>,
    pub phase: Phase,
    /// Completed pagination advances when the snapshot was taken
    pub batch_number: u64,
    pub statistics: Statistics,
    pub config_hash: Option<String>,
    pub jobs: Vec<TrackedJob>,
}

impl CheckpointSnapshot {
    pub fn new(
        phase: Phase,
        batch_number: u64,
        jobs: Vec<TrackedJob>,
        config_hash: Option<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            phase,
            batch_number,
            statistics: Statistics::from_jobs(&jobs),
            config_hash,
            jobs,
        }
    }

    pub fn saved_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|job| job.detail.as_ref().is_some_and(|d| d.is_saved()))
            .count()
    }

    /// Failed jobs grouped by reason
    pub fn failures_by_reason(&self) -> HashMap<FailureReason, usize> {
        let mut counts = HashMap::new();
        for reason in self
            .jobs
            .iter()
            .filter_map(|job| job.detail.as_ref().and_then(|d| d.failure_reason()))
        {
            *counts.entry(reason).or_insert(0) += 1;
        }
        counts
    }
}
