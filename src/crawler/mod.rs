//! Crawler module for listing collection and detail extraction
//!
//! This module contains the core crawling logic, including:
//! - Scanning listing rows and paginating through "load more" controls
//! - Deduplicating identifiers across overlapping batches
//! - Visiting every collected listing and extracting its detail document
//! - Overall run coordination with checkpoints at every step

mod consent;
mod controller;
mod dedup;
mod diagnostics;
mod extractor;
mod paginator;
mod scanner;

pub use consent::dismiss_consent;
pub use controller::{CollectionEnd, CrawlController, RunReport};
pub use dedup::{Deduplicator, MergeOutcome};
pub use diagnostics::Diagnostics;
pub use extractor::{DetailExtractor, DetailOutcome};
pub use paginator::PaginationAdvancer;
pub use scanner::ListingScanner;

use crate::config::{Config, CrawlerConfig, SessionConfig, SiteProfile, TimeoutConfig};
use crate::driver::HttpPageDriver;
use crate::storage::CheckpointStore;
use crate::SweepError;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which phases a run executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RunMode {
    /// Identifier collection only
    Collect,
    /// Detail extraction from a checkpoint only
    Extract,
    /// Collection followed by extraction
    #[default]
    Process,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collect => "collect",
            Self::Extract => "extract",
            Self::Process => "process",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "collect" => Ok(Self::Collect),
            "extract" => Ok(Self::Extract),
            "process" => Ok(Self::Process),
            other => Err(format!("unknown run mode '{}'", other)),
        }
    }
}

/// Per-run knobs, seeded from `[crawler]` and overridden from the CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub mode: RunMode,
    pub target_count: usize,
    pub checkpoint_interval: u32,
    /// At most this many listings are extracted per run
    pub detail_batch_size: Option<usize>,
    /// Reset failed listings to unprocessed before extraction
    pub retry_failed: bool,
}

impl RunOptions {
    pub fn from_config(crawler: &CrawlerConfig, mode: RunMode) -> Self {
        Self {
            mode,
            target_count: crawler.target_count,
            checkpoint_interval: crawler.checkpoint_interval,
            detail_batch_size: crawler.detail_batch_size,
            retry_failed: false,
        }
    }
}

/// Wait bounds shared by the crawler components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSettings {
    pub element_wait: Duration,
    pub poll_interval: Duration,
    /// Fixed delay after opening a detail view
    pub settle: Duration,
}

impl From<&TimeoutConfig> for WaitSettings {
    fn from(timeouts: &TimeoutConfig) -> Self {
        Self {
            element_wait: timeouts.element_wait(),
            poll_interval: timeouts.poll_interval(),
            settle: timeouts.settle(),
        }
    }
}

/// Where a run takes its starting state from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeFrom {
    /// Ignore checkpoints and start empty
    Fresh,
    /// The latest checkpoint, when one exists
    Latest,
    /// A specific checkpoint record
    Path(PathBuf),
}

/// Runs a complete crawl operation against the HTTP page driver
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Load the checkpoint to resume from, if any
/// 2. Construct the controller for the site
/// 3. Open the driver session and run the phases `options.mode` selects
///
/// A checkpoint that cannot be read degrades to a fresh start, except in
/// extract mode, which has nothing to work on without one.
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `site` - The site profile to crawl
/// * `keyword` - Optional listing filter
/// * `options` - Run mode and limits
/// * `resume` - Which checkpoint to start from
/// * `config_hash` - Hash of the config file, recorded in checkpoints
pub async fn run_crawl(
    config: &Config,
    site: SiteProfile,
    keyword: Option<&str>,
    options: &RunOptions,
    resume: ResumeFrom,
    config_hash: Option<String>,
) -> crate::Result<RunReport> {
    let store = CheckpointStore::new(&config.output.checkpoint_dir);

    let snapshot = match &resume {
        ResumeFrom::Fresh => None,
        ResumeFrom::Latest => store.load(None),
        ResumeFrom::Path(path) => store.load(Some(path.as_path())),
    };

    if snapshot.is_none() && resume != ResumeFrom::Fresh {
        tracing::info!("No usable checkpoint found, starting at batch 0");
    }

    if options.mode == RunMode::Extract && snapshot.is_none() {
        return Err(SweepError::MissingCheckpoint(format!(
            "extract mode found no checkpoint in {}",
            store.dir().display()
        )));
    }

    let mut controller =
        CrawlController::new(config, site, keyword)?.with_config_hash(config_hash);

    let open_session = |session: &SessionConfig| {
        HttpPageDriver::new(session, &config.user_agent, &config.timeouts)
    };

    match snapshot {
        Some(snapshot) => controller.resume(&open_session, snapshot, options).await,
        None => controller.start(&open_session, options).await,
    }
}
