//! Configuration module for Listing-Sweep
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and resolving site profiles.
//!
//! # Example
//!
//! ```no_run
//! use listing_sweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Collecting up to {} listings", config.crawler.target_count);
//! ```

mod parser;
pub mod sites;
mod types;
mod validation;

// Re-export types
pub use sites::{ContentStrategy, RowFields, SiteProfile};
pub use types::{
    Config, CrawlerConfig, OutputConfig, SessionConfig, TimeoutConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::{validate, validate_site};
