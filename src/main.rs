//! Listing-Sweep main entry point
//!
//! This is the command-line interface for the Listing-Sweep crawler.

use anyhow::{bail, Context};
use clap::Parser;
use listing_sweep::config::{load_config_with_hash, validate, validate_site, Config, SiteProfile};
use listing_sweep::crawler::{run_crawl, ResumeFrom, RunMode, RunOptions};
use listing_sweep::output::{print_statistics, SweepStatistics};
use listing_sweep::storage::CheckpointStore;
use listing_sweep::SweepError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Listing-Sweep: a resumable crawler for "load more" job-listing sites
///
/// Listing-Sweep collects listing identifiers across progressive pagination,
/// then visits each listing to save its detail document. Progress is
/// checkpointed so interrupted runs can be resumed.
#[derive(Parser, Debug)]
#[command(name = "listing-sweep")]
#[command(version)]
#[command(about = "A resumable crawler for load-more job listings", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Site profile to crawl (overrides [crawler] site)
    #[arg(long, value_name = "NAME")]
    site: Option<String>,

    /// Keyword filter for the listing
    #[arg(long, value_name = "TEXT")]
    keyword: Option<String>,

    /// Number of unique listings to collect
    #[arg(long, value_name = "N")]
    target: Option<usize>,

    /// Checkpoint every N batches or extracted listings
    #[arg(long, value_name = "N")]
    checkpoint_interval: Option<u32>,

    /// Resume from a specific checkpoint file
    #[arg(long, value_name = "PATH", conflicts_with_all = ["resume_latest", "fresh"])]
    resume: Option<PathBuf>,

    /// Resume from the latest checkpoint
    #[arg(long, conflicts_with = "fresh")]
    resume_latest: bool,

    /// Maximum listings to extract in this run
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,

    /// Phases to run
    #[arg(long, value_enum, default_value_t = RunMode::Process)]
    mode: RunMode,

    /// Retry listings whose extraction failed earlier
    #[arg(long)]
    retry_failed: bool,

    /// Start a fresh crawl, ignoring previous checkpoints
    #[arg(long)]
    fresh: bool,

    /// Show statistics from the latest (or --resume) checkpoint and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Applies command-line overrides to the loaded configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(site) = &self.site {
            config.crawler.site = site.clone();
        }
        if let Some(keyword) = &self.keyword {
            config.crawler.keyword = Some(keyword.clone());
        }
        if let Some(target) = self.target {
            config.crawler.target_count = target;
        }
        if let Some(interval) = self.checkpoint_interval {
            config.crawler.checkpoint_interval = interval;
        }
        if let Some(batch_size) = self.batch_size {
            config.crawler.detail_batch_size = Some(batch_size);
        }
    }

    /// Checkpoint the run starts from
    ///
    /// Extract mode reads the latest checkpoint unless told otherwise; the
    /// other modes start fresh unless a resume flag is given.
    fn resume_from(&self) -> ResumeFrom {
        if self.fresh {
            ResumeFrom::Fresh
        } else if let Some(path) = &self.resume {
            ResumeFrom::Path(path.clone())
        } else if self.resume_latest || self.mode == RunMode::Extract {
            ResumeFrom::Latest
        } else {
            ResumeFrom::Fresh
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path).map_err(|e| {
                tracing::error!("Failed to load configuration: {}", e);
                e
            })?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, Some(hash))
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            (Config::default(), None)
        }
    };

    cli.apply_overrides(&mut config);
    validate(&config).context("Invalid configuration")?;

    let site = resolve_site(&config)?;

    if cli.dry_run {
        handle_dry_run(&config, &site, &cli)?;
    } else if cli.stats {
        handle_stats(&config, cli.resume.clone())?;
    } else {
        handle_crawl(&config, site, &cli, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_sweep=info,warn"),
            1 => EnvFilter::new("listing_sweep=debug,info"),
            2 => EnvFilter::new("listing_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Looks up and validates the configured site profile
fn resolve_site(config: &Config) -> anyhow::Result<SiteProfile> {
    let site = config.site(&config.crawler.site).ok_or_else(|| {
        SweepError::UnknownSite(format!(
            "'{}' (available: {})",
            config.crawler.site,
            config.site_names().join(", ")
        ))
    })?;
    validate_site(&site).context("Invalid site profile")?;
    Ok(site)
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, site: &SiteProfile, cli: &Cli) -> anyhow::Result<()> {
    println!("=== Listing-Sweep Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Mode: {}", cli.mode);
    println!("  Target count: {}", config.crawler.target_count);
    println!("  Checkpoint interval: {}", config.crawler.checkpoint_interval);
    match config.crawler.detail_batch_size {
        Some(size) => println!("  Detail batch size: {}", size),
        None => println!("  Detail batch size: all remaining"),
    }
    println!(
        "  Empty batch threshold: {}",
        config.crawler.empty_batch_threshold
    );
    println!("  Max driver errors: {}", config.crawler.max_driver_errors);

    println!("\nTimeouts:");
    println!("  Page load: {}s", config.timeouts.page_load_secs);
    println!("  Element wait: {}s", config.timeouts.element_wait_secs);
    println!("  Settle delay: {}ms", config.timeouts.settle_ms);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nSite '{}':", site.name);
    let listing_url = site
        .listing_url_for(config.crawler.keyword.as_deref())
        .context("Invalid listing URL")?;
    println!("  Listing: {}", listing_url);
    match &site.detail_url_template {
        Some(template) => println!("  Detail URLs: {}", template),
        None => println!("  Detail URLs: by clicking listing rows"),
    }
    println!("  Load-more strategies: {}", site.load_more.len());
    println!("  Content strategies: {}", site.content.len());

    println!("\nOutput:");
    println!("  Checkpoints: {}", config.output.checkpoint_dir);
    println!("  Details: {}", config.output.details_dir);
    println!("  Diagnostics: {}", config.output.diagnostics_dir);
    println!("  Summaries: {}", config.output.summary_dir);

    match cli.resume_from() {
        ResumeFrom::Fresh => println!("\nStart: fresh"),
        ResumeFrom::Latest => println!("\nStart: latest checkpoint (if any)"),
        ResumeFrom::Path(path) => println!("\nStart: checkpoint {}", path.display()),
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from a checkpoint
fn handle_stats(config: &Config, path: Option<PathBuf>) -> anyhow::Result<()> {
    let store = CheckpointStore::new(&config.output.checkpoint_dir);
    let path = path.unwrap_or_else(|| store.latest_path());

    println!("Checkpoint: {}\n", path.display());

    let snapshot = store
        .try_load(Some(path.as_path()))
        .with_context(|| format!("Could not read checkpoint {}", path.display()))?;

    print_statistics(&SweepStatistics::from_snapshot(&snapshot));

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    site: SiteProfile,
    cli: &Cli,
    config_hash: Option<String>,
) -> anyhow::Result<()> {
    let mut options = RunOptions::from_config(&config.crawler, cli.mode);
    options.retry_failed = cli.retry_failed;

    let resume = cli.resume_from();
    if resume == ResumeFrom::Fresh {
        tracing::info!("Starting fresh {} run on site '{}'", options.mode, site.name);
    } else {
        tracing::info!(
            "Starting {} run on site '{}' (will resume from checkpoint)",
            options.mode,
            site.name
        );
    }

    let report = match run_crawl(
        config,
        site,
        config.crawler.keyword.as_deref(),
        &options,
        resume,
        config_hash,
    )
    .await
    {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            bail!(e);
        }
    };

    if let Some(end) = report.collection_end {
        tracing::info!("Collection ended: {:?}", end);
    }
    tracing::info!(
        "Run {}: {} listings collected, {} processed, {} remaining; {} of {} extracted this run",
        report.final_state,
        report.statistics.total_collected,
        report.statistics.details_fetched,
        report.statistics.remaining,
        report.saved,
        report.attempted
    );

    Ok(())
}
