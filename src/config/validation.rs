use crate::config::sites::SiteProfile;
use crate::config::types::{Config, CrawlerConfig, OutputConfig, TimeoutConfig, UserAgentConfig};
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawler_config(&config.crawler)?;
    validate_timeout_config(&config.timeouts)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    for site in &config.sites {
        validate_site(site)?;
    }
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    if config.site.trim().is_empty() {
        return Err(ConfigError::Validation("site cannot be empty".to_string()));
    }

    if config.target_count < 1 {
        return Err(ConfigError::Validation(format!(
            "target_count must be >= 1, got {}",
            config.target_count
        )));
    }

    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint_interval must be >= 1, got {}",
            config.checkpoint_interval
        )));
    }

    if config.detail_batch_size == Some(0) {
        return Err(ConfigError::Validation(
            "detail_batch_size must be >= 1 when set".to_string(),
        ));
    }

    if config.empty_batch_threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "empty_batch_threshold must be >= 1, got {}",
            config.empty_batch_threshold
        )));
    }

    if config.max_driver_errors < 1 {
        return Err(ConfigError::Validation(format!(
            "max_driver_errors must be >= 1, got {}",
            config.max_driver_errors
        )));
    }

    Ok(())
}

fn validate_timeout_config(config: &TimeoutConfig) -> ConfigResult<()> {
    if config.page_load_secs < 1 {
        return Err(ConfigError::Validation(
            "page-load timeout must be >= 1s".to_string(),
        ));
    }

    if config.element_wait_secs < 1 {
        return Err(ConfigError::Validation(
            "element-wait timeout must be >= 1s".to_string(),
        ));
    }

    if config.poll_interval_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "poll-interval-ms must be >= 10ms, got {}ms",
            config.poll_interval_ms
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> ConfigResult<()> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    if let Some(contact_email) = &config.contact_email {
        validate_email(contact_email)?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    let paths = [
        ("checkpoint_dir", &config.checkpoint_dir),
        ("details_dir", &config.details_dir),
        ("diagnostics_dir", &config.diagnostics_dir),
        ("summary_dir", &config.summary_dir),
    ];

    for (name, path) in paths {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

/// Validates a site profile and every locator in it
pub fn validate_site(site: &SiteProfile) -> ConfigResult<()> {
    if site.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "site name cannot be empty".to_string(),
        ));
    }

    let listing = Url::parse(&site.listing_url).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Invalid listing-url '{}' for site '{}': {}",
            site.listing_url, site.name, e
        ))
    })?;

    if !matches!(listing.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "listing-url for site '{}' must use http or https",
            site.name
        )));
    }

    if let Some(template) = &site.detail_url_template {
        if !template.contains("{id}") {
            return Err(ConfigError::Validation(format!(
                "detail-url-template for site '{}' must contain {{id}}",
                site.name
            )));
        }
        Url::parse(&template.replace("{id}", "0")).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "Invalid detail-url-template for site '{}': {}",
                site.name, e
            ))
        })?;
    }

    if let Some(pattern) = &site.fields.id_pattern {
        regex::Regex::new(pattern).map_err(|e| ConfigError::InvalidLocator {
            site: site.name.clone(),
            message: format!("fields.id-pattern: {}", e),
        })?;
    }

    for (place, locator) in site.locators() {
        locator
            .validate()
            .map_err(|message| ConfigError::InvalidLocator {
                site: site.name.clone(),
                message: format!("{}: {}", place, message),
            })?;
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> ConfigResult<()> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
