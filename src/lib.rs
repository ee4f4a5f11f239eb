//! Listing-Sweep: a resumable crawler for "load more" job-listing sites
//!
//! This crate collects listing identifiers across progressive pagination,
//! then visits every collected listing to extract its detail document. All
//! progress is checkpointed to disk so an interrupted run can be resumed
//! without re-fetching data it already holds.

pub mod config;
pub mod crawler;
pub mod driver;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Listing-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Page driver error: {0}")]
    Driver(#[from] driver::DriverError),

    #[error("Failed to start page driver session: {0}")]
    SessionStart(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlState,
        to: state::CrawlState,
    },

    #[error("No checkpoint available to resume from: {0}")]
    MissingCheckpoint(String),

    #[error("Unknown site profile: {0}")]
    UnknownSite(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid locator in site '{site}': {message}")]
    InvalidLocator { site: String, message: String },
}

/// Result type alias for Listing-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlController, RunMode, RunOptions};
pub use driver::{DriverError, Locator, PageDriver};
pub use state::{CrawlState, JobSummary, Phase};
pub use storage::{CheckpointSnapshot, CheckpointStore};
