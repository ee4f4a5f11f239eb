//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: The controller state machine (idle, collecting, extracting, terminal)
//! - `Phase`: The phase recorded in checkpoints for resume
//! - `JobSummary` / `DetailRecord`: Per-listing records and extraction outcomes

mod crawl_state;
mod job;

// Re-export main types
pub use crawl_state::{CrawlState, Phase};
pub use job::{DetailRecord, DetailStatus, FailureReason, JobSummary, TrackedJob, UNKNOWN_FIELD};
