//! Output module for reports and statistics
//!
//! This module handles:
//! - The JSON extraction summary written after every extraction phase
//! - Statistics of a checkpoint for the `--stats` view

pub mod stats;
mod summary;

pub use stats::{print_statistics, SweepStatistics};
pub use summary::{
    write_extraction_summary, ExtractionSummary, OutputError, OutputResult, SummaryEntry,
};
