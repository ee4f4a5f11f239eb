//! Detail extraction
//!
//! One call handles one listing end to end:
//! 1. Open the detail view (row link, detail URL template, or clicking the row)
//! 2. Wait for it to render, then let client-side content settle
//! 3. Walk the content strategy table; the first element with text wins,
//!    falling back to the whole `<body>`
//! 4. Persist the document (and a screenshot) or capture diagnostics
//! 5. Navigate back to the listing view, whatever happened before

use crate::config::SiteProfile;
use crate::crawler::diagnostics::Diagnostics;
use crate::crawler::scanner::ListingScanner;
use crate::crawler::WaitSettings;
use crate::driver::{wait_until, Condition, DriverError, DriverResult, Locator, PageDriver};
use crate::state::{DetailRecord, FailureReason, JobSummary};
use crate::storage::DetailSink;
use chrono::Local;

/// What reading one detail view produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailOutcome {
    Saved {
        content: String,
        /// Label of the content strategy that matched
        strategy: String,
    },
    Failed {
        reason: FailureReason,
        message: String,
    },
}

impl DetailOutcome {
    fn failed(reason: FailureReason, message: impl Into<String>) -> Self {
        Self::Failed {
            reason,
            message: message.into(),
        }
    }

    fn from_driver_error(error: DriverError) -> Self {
        let reason = match &error {
            DriverError::Timeout { .. } => FailureReason::Timeout,
            DriverError::ElementNotFound(_)
            | DriverError::StaleElement
            | DriverError::NotInteractable(_) => FailureReason::NotFound,
            _ => FailureReason::NavigationError,
        };
        Self::failed(reason, error.to_string())
    }
}

/// Visits listings and extracts their detail documents
pub struct DetailExtractor {
    profile: SiteProfile,
    scanner: ListingScanner,
    listing_url: String,
    waits: WaitSettings,
    sink: DetailSink,
    capture_screenshots: bool,
    diagnostics: Diagnostics,
}

impl DetailExtractor {
    pub fn new(
        profile: SiteProfile,
        listing_url: String,
        waits: WaitSettings,
        sink: DetailSink,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            scanner: ListingScanner::new(profile.clone()),
            profile,
            listing_url,
            waits,
            sink,
            capture_screenshots: false,
            diagnostics,
        }
    }

    /// Saves a screenshot next to every document
    pub fn with_screenshots(mut self, enabled: bool) -> Self {
        self.capture_screenshots = enabled;
        self
    }

    /// Extracts one listing and records the result
    ///
    /// Always leaves the driver on the listing view.
    pub async fn extract<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        job: &JobSummary,
    ) -> DetailRecord {
        let outcome = self.read_detail(driver, job).await;

        let record = match outcome {
            DetailOutcome::Saved { content, strategy } => {
                tracing::debug!("Job {} content matched strategy '{}'", job.id, strategy);
                self.persist(driver, job, &content).await
            }
            DetailOutcome::Failed { reason, message } => {
                tracing::warn!("Extraction of job {} failed ({}): {}", job.id, reason, message);
                self.diagnostics
                    .capture(driver, &format!("failed_description_{}", label_safe(&job.id)))
                    .await;
                DetailRecord::failed(&job.id, reason, message)
            }
        };

        self.return_to_listing(driver).await;
        record
    }

    /// Opens the detail view and reads its content, without persisting
    pub async fn read_detail<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        job: &JobSummary,
    ) -> DetailOutcome {
        if let Err(outcome) = self.open_detail(driver, job).await {
            return outcome;
        }

        if !self.waits.settle.is_zero() {
            tokio::time::sleep(self.waits.settle).await;
        }

        match self.read_content(driver).await {
            Ok(Some((strategy, content))) => DetailOutcome::Saved { content, strategy },
            Ok(None) => DetailOutcome::failed(
                FailureReason::EmptyContent,
                "no content strategy produced text",
            ),
            Err(e) => DetailOutcome::from_driver_error(e),
        }
    }

    async fn open_detail<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        job: &JobSummary,
    ) -> Result<(), DetailOutcome> {
        let direct = job
            .url
            .clone()
            .or_else(|| self.profile.detail_url(&job.id));

        match direct {
            Some(url) => {
                tracing::debug!("Opening job {} at {}", job.id, url);
                driver
                    .navigate(&url)
                    .await
                    .map_err(DetailOutcome::from_driver_error)?;
            }
            None => self.activate_row(driver, &job.id).await?,
        }

        wait_until(
            driver,
            &Condition::Ready,
            self.waits.element_wait,
            self.waits.poll_interval,
        )
        .await
        .map_err(DetailOutcome::from_driver_error)?;

        if let Some(marker) = &self.profile.detail_ready {
            wait_until(
                driver,
                &Condition::Present(marker.clone()),
                self.waits.element_wait,
                self.waits.poll_interval,
            )
            .await
            .map_err(DetailOutcome::from_driver_error)?;
        }

        Ok(())
    }

    /// Clicks the listing row carrying the identifier
    async fn activate_row<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        id: &str,
    ) -> Result<(), DetailOutcome> {
        let row = self
            .scanner
            .find_row(driver, id)
            .await
            .map_err(DetailOutcome::from_driver_error)?
            .ok_or_else(|| {
                DetailOutcome::failed(
                    FailureReason::NotFound,
                    format!("no listing row with identifier {}", id),
                )
            })?;

        tracing::debug!("Opening job {} by clicking its row", id);
        driver
            .click(&row)
            .await
            .map_err(DetailOutcome::from_driver_error)
    }

    /// First strategy whose element has non-blank text, as (label, html)
    async fn read_content<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
    ) -> DriverResult<Option<(String, String)>> {
        for strategy in &self.profile.content {
            if let Some(html) = non_blank_html(driver, &strategy.locator).await? {
                return Ok(Some((strategy.label.clone(), html)));
            }
            tracing::debug!("Content strategy '{}' found nothing", strategy.label);
        }

        Ok(non_blank_html(driver, &Locator::css("body"))
            .await?
            .map(|html| ("body".to_string(), html)))
    }

    async fn persist<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        job: &JobSummary,
        content: &str,
    ) -> DetailRecord {
        let now = Local::now();

        let document = match self.sink.save_document(&job.id, content, now) {
            Ok(path) => path,
            Err(e) => {
                return DetailRecord::failed(
                    &job.id,
                    FailureReason::SinkWrite,
                    format!("failed to write document: {}", e),
                )
            }
        };

        let screenshot = if self.capture_screenshots {
            let path = self.sink.screenshot_path(&job.id, now);
            match driver.screenshot(&path).await {
                Ok(()) => Some(path),
                Err(DriverError::Unsupported(_)) => None,
                Err(e) => {
                    tracing::warn!("Screenshot for job {} failed: {}", job.id, e);
                    None
                }
            }
        } else {
            None
        };

        tracing::info!("Saved job {} to {}", job.id, document.display());
        DetailRecord::saved(&job.id, document, screenshot)
    }

    /// Reloads the listing view and waits for its ready marker
    pub async fn return_to_listing<D: PageDriver + ?Sized>(&self, driver: &mut D) -> bool {
        if let Err(e) = driver.navigate(&self.listing_url).await {
            tracing::warn!("Could not return to listing {}: {}", self.listing_url, e);
            return false;
        }

        match wait_until(
            driver,
            &Condition::Present(self.profile.listing_ready.clone()),
            self.waits.element_wait,
            self.waits.poll_interval,
        )
        .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Listing view not ready after return: {}", e);
                false
            }
        }
    }
}

async fn non_blank_html<D: PageDriver + ?Sized>(
    driver: &mut D,
    locator: &Locator,
) -> DriverResult<Option<String>> {
    let Some(element) = driver.find(locator).await? else {
        return Ok(None);
    };
    if driver.text(&element).await?.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(driver.html(&element).await?))
}

fn label_safe(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::sites::interamt;
    use crate::config::ContentStrategy;
    use crate::driver::memory::MemoryPageDriver;
    use crate::state::DetailStatus;
    use std::time::Duration;
    use tempfile::TempDir;

    const LISTING: &str = "https://jobs.test/list";

    fn waits() -> WaitSettings {
        WaitSettings {
            element_wait: Duration::from_millis(30),
            poll_interval: Duration::from_millis(1),
            settle: Duration::ZERO,
        }
    }

    fn profile() -> SiteProfile {
        let mut profile = interamt();
        profile.listing_url = LISTING.to_string();
        profile.detail_url_template = Some("https://jobs.test/job?id={id}".to_string());
        profile.content = vec![
            ContentStrategy::new("richtext", Locator::css("div.richtext")),
            ContentStrategy::new("description", Locator::class_pattern(Some("div"), "description")),
        ];
        profile
    }

    fn listing_html() -> String {
        r#"<table><tbody>
             <tr data-href="/job?id=55"><td data-field="StellenangebotId"><span>55</span></td></tr>
           </tbody></table>"#
            .to_string()
    }

    fn extractor(dir: &TempDir, profile: SiteProfile) -> DetailExtractor {
        DetailExtractor::new(
            profile,
            LISTING.to_string(),
            waits(),
            DetailSink::new(dir.path().join("details")),
            Diagnostics::new(dir.path().join("diagnostics")),
        )
    }

    #[tokio::test]
    async fn test_saves_first_matching_strategy() {
        let dir = TempDir::new().unwrap();
        let mut driver = MemoryPageDriver::new()
            .with_page(LISTING, &listing_html())
            .with_page(
                "https://jobs.test/job?id=1",
                r#"<body><div class="richtext">   </div>
                   <div class="job-description"><p>Wir suchen</p></div></body>"#,
            );

        let extractor = extractor(&dir, profile()).with_screenshots(true);
        let record = extractor
            .extract(&mut driver, &JobSummary::new("1", "Org", "Title"))
            .await;

        let DetailStatus::Saved { document, screenshot } = &record.status else {
            panic!("expected saved, got {:?}", record.status);
        };
        let content = std::fs::read_to_string(document.as_ref().unwrap()).unwrap();
        assert!(content.contains("Wir suchen"));
        assert!(content.starts_with("<div class=\"job-description\">"));
        assert!(screenshot.is_some());
        assert_eq!(driver.visits().last().map(String::as_str), Some(LISTING));
    }

    #[tokio::test]
    async fn test_empty_content_fails_and_next_job_proceeds() {
        let dir = TempDir::new().unwrap();
        let mut driver = MemoryPageDriver::new()
            .with_page(LISTING, &listing_html())
            .with_page("https://jobs.test/job?id=123", "<body>  </body>")
            .with_page(
                "https://jobs.test/job?id=124",
                r#"<body><div class="richtext">Aufgaben</div></body>"#,
            );

        let extractor = extractor(&dir, profile());

        let first = extractor
            .extract(&mut driver, &JobSummary::new("123", "Org", "Title"))
            .await;
        assert_eq!(first.failure_reason(), Some(FailureReason::EmptyContent));
        let captured = driver.recorded().lock().unwrap().screenshots.clone();
        assert_eq!(captured.len(), 1);
        assert!(captured[0]
            .to_string_lossy()
            .contains("failed_description_123_"));

        let second = extractor
            .extract(&mut driver, &JobSummary::new("124", "Org", "Title"))
            .await;
        assert!(second.is_saved());

        assert_eq!(
            driver.visits(),
            vec![
                "https://jobs.test/job?id=123".to_string(),
                LISTING.to_string(),
                "https://jobs.test/job?id=124".to_string(),
                LISTING.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_body_fallback() {
        let dir = TempDir::new().unwrap();
        let mut driver = MemoryPageDriver::new()
            .with_page(LISTING, &listing_html())
            .with_page("https://jobs.test/job?id=9", "<body><p>Plain page</p></body>");

        let outcome = extractor(&dir, profile())
            .read_detail(&mut driver, &JobSummary::new("9", "Org", "Title"))
            .await;

        match outcome {
            DetailOutcome::Saved { content, strategy } => {
                assert_eq!(strategy, "body");
                assert!(content.contains("Plain page"));
            }
            other => panic!("expected body fallback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_navigation_failures_map_to_reasons() {
        let dir = TempDir::new().unwrap();
        let mut driver = MemoryPageDriver::new()
            .with_page(LISTING, &listing_html())
            .with_failing("https://jobs.test/job?id=1")
            .with_timeout("https://jobs.test/job?id=2");

        let extractor = extractor(&dir, profile());

        let failed = extractor
            .extract(&mut driver, &JobSummary::new("1", "Org", "Title"))
            .await;
        assert_eq!(failed.failure_reason(), Some(FailureReason::NavigationError));

        let slow = extractor
            .extract(&mut driver, &JobSummary::new("2", "Org", "Title"))
            .await;
        assert_eq!(slow.failure_reason(), Some(FailureReason::Timeout));

        assert_eq!(driver.visits().last().map(String::as_str), Some(LISTING));
    }

    #[tokio::test]
    async fn test_row_click_when_no_direct_address() {
        let dir = TempDir::new().unwrap();
        let mut profile = profile();
        profile.detail_url_template = None;

        let mut driver = MemoryPageDriver::new()
            .with_page(LISTING, &listing_html())
            .with_page(
                "https://jobs.test/job?id=55",
                r#"<body><div class="richtext">Details</div></body>"#,
            );
        driver.navigate(LISTING).await.unwrap();

        let extractor = extractor(&dir, profile);

        let found = extractor
            .extract(&mut driver, &JobSummary::new("55", "Org", "Title"))
            .await;
        assert!(found.is_saved());

        let missing = extractor
            .extract(&mut driver, &JobSummary::new("56", "Org", "Title"))
            .await;
        assert_eq!(missing.failure_reason(), Some(FailureReason::NotFound));
        assert_eq!(driver.visits().last().map(String::as_str), Some(LISTING));
    }

    #[tokio::test]
    async fn test_row_url_preferred_over_template() {
        let dir = TempDir::new().unwrap();
        let mut driver = MemoryPageDriver::new()
            .with_page(LISTING, &listing_html())
            .with_page(
                "https://jobs.test/detail/7",
                r#"<body><div class="richtext">Direct</div></body>"#,
            );

        let job = JobSummary::new("7", "Org", "Title").with_url("https://jobs.test/detail/7");
        let record = extractor(&dir, profile()).extract(&mut driver, &job).await;

        assert!(record.is_saved());
        assert_eq!(driver.visits()[0], "https://jobs.test/detail/7");
    }

    #[tokio::test]
    async fn test_sink_failure_is_recorded() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let mut driver = MemoryPageDriver::new()
            .with_page(LISTING, &listing_html())
            .with_page(
                "https://jobs.test/job?id=1",
                r#"<body><div class="richtext">Text</div></body>"#,
            );

        let extractor = DetailExtractor::new(
            profile(),
            LISTING.to_string(),
            waits(),
            DetailSink::new(blocker.join("details")),
            Diagnostics::disabled(),
        );
        let record = extractor
            .extract(&mut driver, &JobSummary::new("1", "Org", "Title"))
            .await;
        assert_eq!(record.failure_reason(), Some(FailureReason::SinkWrite));
    }
}
