//! Listing row scanner
//!
//! Reads every row currently rendered in the listing view into a
//! [`JobSummary`]. Rows without a usable identifier are skipped, never
//! failing the batch.

use crate::config::SiteProfile;
use crate::driver::{DriverResult, ElementHandle, Locator, PageDriver};
use crate::state::{JobSummary, UNKNOWN_FIELD};
use regex::Regex;
use url::Url;

/// Reads listing rows according to a site profile
pub struct ListingScanner {
    profile: SiteProfile,
    id_pattern: Option<Regex>,
}

impl ListingScanner {
    /// Creates a scanner; an id pattern that does not compile is ignored with a warning
    pub fn new(profile: SiteProfile) -> Self {
        let id_pattern = profile
            .fields
            .id_pattern
            .as_deref()
            .and_then(|pattern| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    tracing::warn!("Ignoring invalid id pattern for '{}': {}", profile.name, e);
                    None
                }
            });

        Self {
            profile,
            id_pattern,
        }
    }

    /// Summaries for every row on the page, in page order
    pub async fn scan<D: PageDriver + ?Sized>(&self, driver: &mut D) -> DriverResult<Vec<JobSummary>> {
        let rows = driver.find_all(&self.profile.rows).await?;

        if rows.is_empty() {
            if let Some(marker) = &self.profile.no_results {
                if driver.find(marker).await?.is_some() {
                    tracing::info!("Listing reports no results");
                }
            }
            return Ok(Vec::new());
        }

        let base = driver.current_url().and_then(|url| Url::parse(&url).ok());
        let mut summaries = Vec::with_capacity(rows.len());

        for (position, row) in rows.iter().enumerate() {
            match self.read_row(driver, row, base.as_ref()).await {
                Ok(Some(summary)) => summaries.push(summary),
                Ok(None) => tracing::debug!("Skipping row {} without identifier", position),
                Err(e) => tracing::warn!("Skipping unreadable row {}: {}", position, e),
            }
        }

        tracing::debug!("Scanned {} rows, {} with identifiers", rows.len(), summaries.len());
        Ok(summaries)
    }

    async fn read_row<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        row: &ElementHandle,
        base: Option<&Url>,
    ) -> DriverResult<Option<JobSummary>> {
        let Some(id) = self.read_identifier(driver, row).await? else {
            return Ok(None);
        };

        let organization = self
            .read_field(driver, row, self.profile.fields.organization.as_ref())
            .await?;
        let title = self
            .read_field(driver, row, self.profile.fields.title.as_ref())
            .await?;

        let mut summary = JobSummary::new(id, organization, title);
        summary.url = self.read_link(driver, row, base).await?;
        Ok(Some(summary))
    }

    /// Identifier of a row, or None if the cell is missing or blank
    pub async fn read_identifier<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        row: &ElementHandle,
    ) -> DriverResult<Option<String>> {
        let cell = match driver.find_within(row, &self.profile.fields.id).await? {
            Some(cell) => cell,
            None => return Ok(None),
        };

        let raw = match &self.profile.fields.id_attribute {
            Some(name) => driver.attribute(&cell, name).await?.unwrap_or_default(),
            None => driver.text(&cell).await?,
        };

        Ok(self.normalize_identifier(&raw))
    }

    fn normalize_identifier(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        let id = match &self.id_pattern {
            Some(pattern) => {
                let captures = pattern.captures(raw)?;
                captures.get(1).or_else(|| captures.get(0))?.as_str().trim()
            }
            None => raw,
        };
        (!id.is_empty()).then(|| id.to_string())
    }

    /// Finds the listing row whose identifier equals `id`
    pub async fn find_row<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        id: &str,
    ) -> DriverResult<Option<ElementHandle>> {
        for row in driver.find_all(&self.profile.rows).await? {
            if self.read_identifier(driver, &row).await?.as_deref() == Some(id) {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    async fn read_field<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        row: &ElementHandle,
        locator: Option<&Locator>,
    ) -> DriverResult<String> {
        let Some(locator) = locator else {
            return Ok(UNKNOWN_FIELD.to_string());
        };

        let text = match driver.find_within(row, locator).await? {
            Some(cell) => driver.text(&cell).await?,
            None => String::new(),
        };

        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            Ok(UNKNOWN_FIELD.to_string())
        } else {
            Ok(text)
        }
    }

    async fn read_link<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        row: &ElementHandle,
        base: Option<&Url>,
    ) -> DriverResult<Option<String>> {
        let Some(locator) = &self.profile.fields.link else {
            return Ok(None);
        };
        let Some(anchor) = driver.find_within(row, locator).await? else {
            return Ok(None);
        };
        let Some(href) = driver.attribute(&anchor, "href").await? else {
            return Ok(None);
        };

        let href = href.trim();
        if href.is_empty() {
            return Ok(None);
        }

        let resolved = match base {
            Some(base) => base.join(href).ok(),
            None => Url::parse(href).ok(),
        };
        Ok(resolved
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .map(|url| url.to_string()))
    }
}
