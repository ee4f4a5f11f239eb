//! Statistics from a checkpoint snapshot
//!
//! Backs the `--stats` view: how far a run got, what was saved, and why
//! the failed listings failed.

use crate::state::{FailureReason, Phase};
use crate::storage::CheckpointSnapshot;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Progress summary of a checkpoint
#[derive(Debug, Clone)]
pub struct SweepStatistics {
    /// When the checkpoint was written
    pub timestamp: DateTime<Utc>,

    pub phase: Phase,

    /// Completed pagination advances
    pub batch_number: u64,

    /// Unique listings collected
    pub total_jobs: usize,

    /// Listings with a saved detail document
    pub saved: usize,

    /// Failed listings by reason
    pub failed_by_reason: HashMap<FailureReason, usize>,

    /// Listings not yet attempted
    pub pending: usize,
}

impl SweepStatistics {
    pub fn from_snapshot(snapshot: &CheckpointSnapshot) -> Self {
        Self {
            timestamp: snapshot.timestamp,
            phase: snapshot.phase,
            batch_number: snapshot.batch_number,
            total_jobs: snapshot.statistics.total_collected,
            saved: snapshot.saved_count(),
            failed_by_reason: snapshot.failures_by_reason(),
            pending: snapshot.statistics.remaining,
        }
    }

    pub fn failed(&self) -> usize {
        self.failed_by_reason.values().sum()
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &SweepStatistics) {
    println!("=== Sweep Statistics ===\n");

    println!("Checkpoint:");
    println!("  Written: {}", stats.timestamp);
    println!("  Phase: {}", stats.phase);
    println!("  Pagination batches: {}", stats.batch_number);
    println!();

    println!("Listings:");
    println!("  Collected: {}", stats.total_jobs);
    for (label, count) in [
        ("Saved", stats.saved),
        ("Failed", stats.failed()),
        ("Pending", stats.pending),
    ] {
        let percentage = if stats.total_jobs > 0 {
            (count as f64 / stats.total_jobs as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", label, count, percentage);
    }
    println!();

    if !stats.failed_by_reason.is_empty() {
        println!("Failures by Reason:");
        let mut reasons: Vec<_> = stats.failed_by_reason.iter().collect();
        reasons.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));

        for (reason, count) in reasons {
            println!("  {}: {}", reason, count);
        }
        println!();
    }
}
