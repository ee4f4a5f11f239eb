//! Running collection of unique listings
//!
//! Batches from the listing view overlap heavily: every "load more" returns
//! the rows already seen plus the new ones. The deduplicator keeps the first
//! occurrence of every identifier in discovery order and counts how many
//! merges in a row produced nothing new.

use crate::state::{DetailRecord, JobSummary, TrackedJob};
use std::collections::HashMap;

/// Result of merging one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Identifiers new to the collection
    pub added: usize,
    /// Identifiers already present (or over the cap)
    pub skipped: usize,
}

/// Collection of unique jobs keyed by identifier
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    jobs: Vec<TrackedJob>,
    index: HashMap<String, usize>,
    limit: Option<usize>,
    empty_streak: u32,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection that stops accepting identifiers at `limit`
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Replaces the collection with jobs restored from a checkpoint
    pub fn seed(&mut self, jobs: Vec<TrackedJob>) {
        self.jobs.clear();
        self.index.clear();
        self.empty_streak = 0;

        for job in jobs {
            if self.index.contains_key(job.id()) {
                continue;
            }
            self.index.insert(job.id().to_string(), self.jobs.len());
            self.jobs.push(job);
        }
    }

    /// Adds every unseen identifier of the batch, in batch order
    pub fn merge(&mut self, batch: Vec<JobSummary>) -> MergeOutcome {
        let mut outcome = MergeOutcome {
            added: 0,
            skipped: 0,
        };

        for summary in batch {
            if self.index.contains_key(&summary.id) || self.is_full() {
                outcome.skipped += 1;
                continue;
            }
            self.index.insert(summary.id.clone(), self.jobs.len());
            self.jobs.push(TrackedJob::new(summary));
            outcome.added += 1;
        }

        if outcome.added == 0 {
            self.empty_streak += 1;
        } else {
            self.empty_streak = 0;
        }

        outcome
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.jobs.len() >= limit)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Consecutive merges that added nothing
    pub fn empty_streak(&self) -> u32 {
        self.empty_streak
    }

    pub fn jobs(&self) -> &[TrackedJob] {
        &self.jobs
    }

    pub fn get(&self, id: &str) -> Option<&TrackedJob> {
        self.index.get(id).map(|&i| &self.jobs[i])
    }

    /// Identifiers not yet attempted, in collection order
    pub fn unprocessed(&self) -> Vec<JobSummary> {
        self.jobs
            .iter()
            .filter(|job| !job.summary.processed)
            .map(|job| job.summary.clone())
            .collect()
    }

    /// Attaches an extraction outcome and marks the job processed
    ///
    /// Returns false when the identifier is not in the collection.
    pub fn record_detail(&mut self, record: DetailRecord) -> bool {
        match self.index.get(&record.job_id) {
            Some(&i) => {
                let job = &mut self.jobs[i];
                job.summary.processed = true;
                job.detail = Some(record);
                true
            }
            None => {
                tracing::warn!("Discarding detail for unknown job '{}'", record.job_id);
                false
            }
        }
    }

    /// Marks every failed job unprocessed again; returns how many
    pub fn reset_failed(&mut self) -> usize {
        let mut reset = 0;
        for job in self.jobs.iter_mut().filter(|job| job.is_failed()) {
            job.summary.processed = false;
            job.detail = None;
            reset += 1;
        }
        reset
    }
}
