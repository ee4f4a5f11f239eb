//! Crawl controller - phase orchestration
//!
//! Drives one run through its phases:
//! - Identifier collection: scan, merge, checkpoint, advance, until the
//!   target is reached or pagination ends, stalls or keeps failing
//! - Detail extraction: every unprocessed listing, one at a time
//!
//! The controller owns the driver session for the whole run and closes it
//! on every exit path. Progress lives in the deduplicated collection and is
//! checkpointed every `checkpoint_interval` batches or items and at every
//! phase boundary.

use crate::config::{Config, SessionConfig, SiteProfile};
use crate::crawler::consent::dismiss_consent;
use crate::crawler::dedup::Deduplicator;
use crate::crawler::diagnostics::Diagnostics;
use crate::crawler::extractor::DetailExtractor;
use crate::crawler::paginator::PaginationAdvancer;
use crate::crawler::scanner::ListingScanner;
use crate::crawler::{RunMode, RunOptions, WaitSettings};
use crate::driver::{bounded, wait_until, Condition, DriverResult, PageDriver};
use crate::output::write_extraction_summary;
use crate::state::{CrawlState, Phase};
use crate::storage::{CheckpointSnapshot, CheckpointStore, DetailSink, Statistics};
use crate::{ConfigError, SweepError};
use std::path::Path;

/// Why identifier collection stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionEnd {
    /// The collection holds `target_count` identifiers
    TargetReached,
    /// No more rows could be revealed
    Exhausted,
    /// Too many consecutive batches added nothing
    Stalled,
    /// Too many consecutive driver errors while scanning
    DriverErrors,
}

/// Outcome of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub final_state: CrawlState,
    /// Set when the run included identifier collection
    pub collection_end: Option<CollectionEnd>,
    pub statistics: Statistics,
    /// Listings attempted during this run
    pub attempted: usize,
    /// Listings saved during this run
    pub saved: usize,
}

/// Runs the collection and extraction phases over one driver session
pub struct CrawlController {
    config: Config,
    profile: SiteProfile,
    listing_url: String,
    scanner: ListingScanner,
    paginator: PaginationAdvancer,
    extractor: DetailExtractor,
    store: CheckpointStore,
    diagnostics: Diagnostics,
    waits: WaitSettings,
    config_hash: Option<String>,
    state: CrawlState,
    collection: Deduplicator,
    batch_number: u64,
}

impl CrawlController {
    /// Creates a controller for one site
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `profile` - The site profile to crawl
    /// * `keyword` - Optional keyword filter for the listing URL
    pub fn new(
        config: &Config,
        profile: SiteProfile,
        keyword: Option<&str>,
    ) -> crate::Result<Self> {
        let listing_url = profile.listing_url_for(keyword).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "Invalid listing-url for site '{}': {}",
                profile.name, e
            ))
        })?;

        let waits = WaitSettings::from(&config.timeouts);
        let diagnostics = Diagnostics::new(&config.output.diagnostics_dir);

        let paginator = PaginationAdvancer::new(
            profile.load_more.clone(),
            profile.rows.clone(),
            waits.element_wait,
            waits.poll_interval,
            diagnostics.clone(),
        );

        let extractor = DetailExtractor::new(
            profile.clone(),
            listing_url.clone(),
            waits,
            DetailSink::new(&config.output.details_dir),
            diagnostics.clone(),
        )
        .with_screenshots(config.output.capture_screenshots);

        Ok(Self {
            config: config.clone(),
            scanner: ListingScanner::new(profile.clone()),
            profile,
            listing_url,
            paginator,
            extractor,
            store: CheckpointStore::new(&config.output.checkpoint_dir),
            diagnostics,
            waits,
            config_hash: None,
            state: CrawlState::Idle,
            collection: Deduplicator::new(),
            batch_number: 0,
        })
    }

    /// Records the configuration hash in every checkpoint
    pub fn with_config_hash(mut self, hash: Option<String>) -> Self {
        self.config_hash = hash;
        self
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn collection(&self) -> &Deduplicator {
        &self.collection
    }

    /// Completed pagination advances
    pub fn batch_number(&self) -> u64 {
        self.batch_number
    }

    pub fn listing_url(&self) -> &str {
        &self.listing_url
    }

    /// Starts a fresh run
    ///
    /// `open_session` is called once to construct the driver session.
    pub async fn start<F, D>(
        &mut self,
        open_session: &F,
        options: &RunOptions,
    ) -> crate::Result<RunReport>
    where
        F: Fn(&SessionConfig) -> DriverResult<D>,
        D: PageDriver,
    {
        if options.mode == RunMode::Extract {
            return Err(SweepError::MissingCheckpoint(
                "extract mode needs a checkpoint to read identifiers from".to_string(),
            ));
        }

        self.collection = Deduplicator::with_limit(options.target_count);
        self.batch_number = 0;
        self.run(open_session, Phase::IdCollection, 0, options).await
    }

    /// Continues a run from a checkpoint
    ///
    /// The collection is seeded from the snapshot. When the snapshot is still
    /// in the collection phase, pagination is replayed `batch_number` times
    /// before scanning resumes.
    pub async fn resume<F, D>(
        &mut self,
        open_session: &F,
        snapshot: CheckpointSnapshot,
        options: &RunOptions,
    ) -> crate::Result<RunReport>
    where
        F: Fn(&SessionConfig) -> DriverResult<D>,
        D: PageDriver,
    {
        tracing::info!(
            "Resuming from checkpoint of {} (phase {}, batch {}, {} jobs), re-entering {}",
            snapshot.timestamp,
            snapshot.phase,
            snapshot.batch_number,
            snapshot.jobs.len(),
            snapshot.phase.resume_state()
        );

        if let (Some(recorded), Some(current)) = (&snapshot.config_hash, &self.config_hash) {
            if recorded != current {
                tracing::warn!("Configuration changed since the checkpoint was written");
            }
        }

        self.collection = Deduplicator::with_limit(options.target_count);
        self.collection.seed(snapshot.jobs);
        self.batch_number = 0;

        let replay = if snapshot.phase == Phase::IdCollection {
            snapshot.batch_number
        } else {
            self.batch_number = snapshot.batch_number;
            0
        };

        self.run(open_session, snapshot.phase, replay, options).await
    }

    fn transition(&mut self, next: CrawlState) -> crate::Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(SweepError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("Controller state {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    async fn run<F, D>(
        &mut self,
        open_session: &F,
        phase: Phase,
        replay: u64,
        options: &RunOptions,
    ) -> crate::Result<RunReport>
    where
        F: Fn(&SessionConfig) -> DriverResult<D>,
        D: PageDriver,
    {
        if self.state != CrawlState::Idle {
            return Err(SweepError::InvalidTransition {
                from: self.state,
                to: CrawlState::CollectingIds,
            });
        }

        let collect = phase == Phase::IdCollection && options.mode != RunMode::Extract;
        let extract = options.mode != RunMode::Collect
            && (phase != Phase::Complete || options.retry_failed);

        if !collect && !extract {
            tracing::info!("Nothing to do for phase {} in {} mode", phase, options.mode);
            self.transition(CrawlState::Complete)?;
            return Ok(self.report(None, 0, 0));
        }

        let mut driver = match open_session(&self.config.session) {
            Ok(driver) => driver,
            Err(e) => {
                self.transition(CrawlState::Failed)?;
                return Err(SweepError::SessionStart(e.to_string()));
            }
        };

        if let Err(e) = driver
            .resize_viewport(
                self.config.session.viewport_width,
                self.config.session.viewport_height,
            )
            .await
        {
            tracing::debug!("Could not resize viewport: {}", e);
        }

        let result = self
            .drive(&mut driver, collect, extract, replay, options)
            .await;

        let closed = bounded(
            self.config.timeouts.page_load(),
            "driver session close",
            driver.close(),
        )
        .await;
        if let Err(e) = closed {
            tracing::warn!("Failed to close driver session: {}", e);
        }

        result
    }

    async fn drive<D: PageDriver>(
        &mut self,
        driver: &mut D,
        collect: bool,
        extract: bool,
        replay: u64,
        options: &RunOptions,
    ) -> crate::Result<RunReport> {
        let mut collection_end = None;

        if collect {
            self.transition(CrawlState::CollectingIds)?;
            let end = self.collect(driver, replay, options).await;
            tracing::info!(
                "Identifier collection ended ({:?}) with {} unique listings after {} batches",
                end,
                self.collection.len(),
                self.batch_number
            );
            collection_end = Some(end);
            self.checkpoint(self.settled_phase(collection_end));
        }

        let (mut attempted, mut saved) = (0, 0);
        if extract {
            self.transition(CrawlState::ExtractingDetails)?;
            (attempted, saved) = self.extract(driver, options).await;
            self.checkpoint(self.settled_phase(collection_end));

            if let Err(e) = write_extraction_summary(
                Path::new(&self.config.output.summary_dir),
                self.collection.jobs(),
            ) {
                tracing::warn!("Failed to write extraction summary: {}", e);
            }
        }

        self.transition(CrawlState::Complete)?;
        Ok(self.report(collection_end, attempted, saved))
    }

    /// Collection loop; returns why it stopped
    async fn collect<D: PageDriver>(
        &mut self,
        driver: &mut D,
        replay: u64,
        options: &RunOptions,
    ) -> CollectionEnd {
        let max_errors = self.config.crawler.max_driver_errors;
        let stall_threshold = self.config.crawler.empty_batch_threshold;
        let interval = u64::from(options.checkpoint_interval.max(1));

        if !self.open_listing(driver).await {
            return CollectionEnd::DriverErrors;
        }

        for replayed in 0..replay {
            if !self.paginator.advance(driver).await {
                tracing::warn!(
                    "Pagination ended while replaying batch {} of {}",
                    replayed + 1,
                    replay
                );
                break;
            }
            self.batch_number += 1;
        }
        if replay > 0 {
            tracing::info!("Replayed {} pagination batches", self.batch_number);
        }

        let mut driver_errors = 0;

        loop {
            if self.collection.len() >= options.target_count {
                return CollectionEnd::TargetReached;
            }

            match self.scanner.scan(driver).await {
                Ok(batch) => {
                    driver_errors = 0;
                    let seen = batch.len();
                    let outcome = self.collection.merge(batch);
                    tracing::info!(
                        "Batch {}: {} rows, {} new, {} total",
                        self.batch_number,
                        seen,
                        outcome.added,
                        self.collection.len()
                    );
                }
                Err(e) => {
                    driver_errors += 1;
                    tracing::warn!(
                        "Scanning batch {} failed ({}/{}): {}",
                        self.batch_number,
                        driver_errors,
                        max_errors,
                        e
                    );
                    self.diagnostics.capture(driver, "scan_error").await;
                    if driver_errors >= max_errors {
                        return CollectionEnd::DriverErrors;
                    }
                    continue;
                }
            }

            if self.collection.len() >= options.target_count {
                return CollectionEnd::TargetReached;
            }

            if self.collection.empty_streak() >= stall_threshold {
                tracing::warn!(
                    "{} consecutive batches added nothing, ending collection",
                    self.collection.empty_streak()
                );
                return CollectionEnd::Stalled;
            }

            if !self.paginator.advance(driver).await {
                return CollectionEnd::Exhausted;
            }
            self.batch_number += 1;

            if self.batch_number % interval == 0 {
                self.checkpoint(Phase::IdCollection);
            }
        }
    }

    /// Extraction loop; returns (attempted, saved)
    async fn extract<D: PageDriver>(
        &mut self,
        driver: &mut D,
        options: &RunOptions,
    ) -> (usize, usize) {
        if options.retry_failed {
            let reset = self.collection.reset_failed();
            tracing::info!("Retrying {} previously failed listings", reset);
        }

        let mut pending = self.collection.unprocessed();
        if let Some(limit) = options.detail_batch_size {
            pending.truncate(limit);
        }

        tracing::info!(
            "Extracting {} of {} unprocessed listings",
            pending.len(),
            self.collection.unprocessed().len()
        );

        if pending.is_empty() {
            return (0, 0);
        }

        if driver.current_url().is_none() {
            self.open_listing(driver).await;
        }

        let interval = options.checkpoint_interval.max(1) as usize;
        let mut saved = 0;

        for (done, job) in pending.iter().enumerate() {
            tracing::info!(
                "Extracting job {} ({}/{}): {}",
                job.id,
                done + 1,
                pending.len(),
                job.title
            );

            let record = self.extractor.extract(driver, job).await;
            if record.is_saved() {
                saved += 1;
            }
            self.collection.record_detail(record);

            if (done + 1) % interval == 0 {
                self.checkpoint(Phase::DetailExtraction);
            }
        }

        (pending.len(), saved)
    }

    /// Loads the listing view, waits for it and dismisses cookie consent
    async fn open_listing<D: PageDriver>(&self, driver: &mut D) -> bool {
        tracing::info!("Opening listing {}", self.listing_url);

        if let Err(e) = driver.navigate(&self.listing_url).await {
            tracing::error!("Could not open listing {}: {}", self.listing_url, e);
            self.diagnostics.capture(driver, "listing_navigation").await;
            return false;
        }

        // An empty result list shows the no-results marker instead of the listing
        let mut ready = vec![self.profile.listing_ready.clone()];
        ready.extend(self.profile.no_results.iter().cloned());

        if let Err(e) = wait_until(
            driver,
            &Condition::AnyPresent(ready),
            self.waits.element_wait,
            self.waits.poll_interval,
        )
        .await
        {
            tracing::warn!("Listing view not ready: {}", e);
            self.diagnostics.capture(driver, "listing_not_ready").await;
        }

        dismiss_consent(driver, &self.profile.consent).await;
        true
    }

    /// Phase a checkpoint written now should record
    ///
    /// Collection that failed before gathering anything stays in the
    /// collection phase so a resume starts it over.
    fn settled_phase(&self, collection_end: Option<CollectionEnd>) -> Phase {
        if collection_end == Some(CollectionEnd::DriverErrors) && self.collection.is_empty() {
            Phase::IdCollection
        } else if self.collection.unprocessed().is_empty() {
            Phase::Complete
        } else {
            Phase::DetailExtraction
        }
    }

    fn checkpoint(&self, phase: Phase) -> bool {
        let snapshot = CheckpointSnapshot::new(
            phase,
            self.batch_number,
            self.collection.jobs().to_vec(),
            self.config_hash.clone(),
        );
        self.store.save_or_warn(&snapshot)
    }

    fn report(
        &self,
        collection_end: Option<CollectionEnd>,
        attempted: usize,
        saved: usize,
    ) -> RunReport {
        RunReport {
            final_state: self.state,
            collection_end,
            statistics: Statistics::from_jobs(self.collection.jobs()),
            attempted,
            saved,
        }
    }
}
