use crate::config::sites::SiteProfile;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Listing-Sweep
///
/// Every section is optional in the TOML file; missing sections take their
/// defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Custom site profiles; a profile named like a built-in replaces it
    #[serde(rename = "site", default)]
    pub sites: Vec<SiteProfile>,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Site profile to crawl
    pub site: String,

    /// Optional keyword filter applied to the listing URL
    pub keyword: Option<String>,

    /// Number of unique listing identifiers to collect
    #[serde(rename = "target-count")]
    pub target_count: usize,

    /// Snapshot every N pagination batches / N extracted details
    #[serde(rename = "checkpoint-interval")]
    pub checkpoint_interval: u32,

    /// Maximum details to extract per run (all remaining when unset)
    #[serde(rename = "detail-batch-size")]
    pub detail_batch_size: Option<usize>,

    /// Consecutive zero-new-identifier batches that end collection
    #[serde(rename = "empty-batch-threshold")]
    pub empty_batch_threshold: u32,

    /// Consecutive driver errors that end collection
    #[serde(rename = "max-driver-errors")]
    pub max_driver_errors: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            site: "interamt".to_string(),
            keyword: None,
            target_count: 200,
            checkpoint_interval: 5,
            detail_batch_size: None,
            empty_batch_threshold: 3,
            max_driver_errors: 3,
        }
    }
}

/// Bounds for every wait against the page driver
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Page load timeout (seconds)
    #[serde(rename = "page-load")]
    pub page_load_secs: u64,

    /// Element / condition wait timeout (seconds)
    #[serde(rename = "element-wait")]
    pub element_wait_secs: u64,

    /// Interval between condition probes (milliseconds)
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Fixed delay after opening a detail view for client-side rendering (milliseconds)
    #[serde(rename = "settle-ms")]
    pub settle_ms: u64,
}

impl TimeoutConfig {
    pub fn page_load(&self) -> Duration {
        Duration::from_secs(self.page_load_secs)
    }

    pub fn element_wait(&self) -> Duration {
        Duration::from_secs(self.element_wait_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            page_load_secs: 30,
            element_wait_secs: 15,
            poll_interval_ms: 250,
            settle_ms: 1000,
        }
    }
}

/// Launch settings handed to the driver session at construction
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    #[serde(rename = "viewport-width")]
    pub viewport_width: u32,

    #[serde(rename = "viewport-height")]
    pub viewport_height: u32,

    /// Accept invalid TLS certificates
    #[serde(rename = "accept-invalid-certs")]
    pub accept_invalid_certs: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1200,
            viewport_height: 1600,
            accept_invalid_certs: false,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: Option<String>,
}

impl UserAgentConfig {
    /// Formats the header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        let contact: Vec<String> = self
            .contact_url
            .iter()
            .map(|url| format!("+{}", url))
            .chain(self.contact_email.iter().cloned())
            .collect();

        if contact.is_empty() {
            format!("{}/{}", self.crawler_name, self.crawler_version)
        } else {
            format!(
                "{}/{} ({})",
                self.crawler_name,
                self.crawler_version,
                contact.join("; ")
            )
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "listing-sweep".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
            contact_email: None,
        }
    }
}

/// Output locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for checkpoint snapshots
    #[serde(rename = "checkpoint-dir")]
    pub checkpoint_dir: String,

    /// Directory for extracted detail documents
    #[serde(rename = "details-dir")]
    pub details_dir: String,

    /// Directory for diagnostic captures
    #[serde(rename = "diagnostics-dir")]
    pub diagnostics_dir: String,

    /// Directory for extraction summaries
    #[serde(rename = "summary-dir")]
    pub summary_dir: String,

    /// Capture a screenshot next to every saved detail document
    #[serde(rename = "capture-screenshots")]
    pub capture_screenshots: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: "./checkpoints".to_string(),
            details_dir: "./job_details".to_string(),
            diagnostics_dir: "./diagnostics".to_string(),
            summary_dir: ".".to_string(),
            capture_screenshots: true,
        }
    }
}
