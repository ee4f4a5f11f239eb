//! "Load more" pagination
//!
//! Strategies are tried in the order the site profile lists them; the first
//! locator that resolves decides the outcome. Any failure after that point
//! (hidden, disabled, click error, listing never settles) counts as
//! exhaustion for this call.

use crate::crawler::diagnostics::Diagnostics;
use crate::driver::{wait_until, Condition, DriverError, ElementHandle, Locator, PageDriver};
use std::time::Duration;

/// Reveals more listing rows
pub struct PaginationAdvancer {
    strategies: Vec<Locator>,
    rows: Locator,
    wait_timeout: Duration,
    poll_interval: Duration,
    diagnostics: Diagnostics,
}

impl PaginationAdvancer {
    pub fn new(
        strategies: Vec<Locator>,
        rows: Locator,
        wait_timeout: Duration,
        poll_interval: Duration,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            strategies,
            rows,
            wait_timeout,
            poll_interval,
            diagnostics,
        }
    }

    /// Triggers one "load more"; false means no more rows can be revealed
    pub async fn advance<D: PageDriver + ?Sized>(&self, driver: &mut D) -> bool {
        let Some((locator, control)) = self.resolve_control(driver).await else {
            tracing::info!("No load-more control found, pagination exhausted");
            return false;
        };

        match (
            driver.is_visible(&control).await,
            driver.is_enabled(&control).await,
        ) {
            (Ok(true), Ok(true)) => {}
            (Ok(visible), Ok(enabled)) => {
                tracing::info!(
                    "Load-more control {} not usable (visible: {}, enabled: {})",
                    locator,
                    visible,
                    enabled
                );
                return false;
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("Could not inspect load-more control {}: {}", locator, e);
                return false;
            }
        }

        if let Err(e) = driver.click(&control).await {
            tracing::warn!("Load-more click via {} failed: {}", locator, e);
            self.diagnostics.capture(driver, "pagination_click").await;
            return false;
        }

        let settled = wait_until(
            driver,
            &Condition::Stable(self.rows.clone()),
            self.wait_timeout,
            self.poll_interval,
        )
        .await;

        match settled {
            Ok(()) => {
                tracing::debug!("Loaded more rows via {}", locator);
                true
            }
            Err(e @ DriverError::Timeout { .. }) => {
                tracing::warn!("Listing did not settle after load-more: {}", e);
                self.diagnostics.capture(driver, "pagination_timeout").await;
                false
            }
            Err(e) => {
                tracing::warn!("Waiting for listing after load-more failed: {}", e);
                false
            }
        }
    }

    async fn resolve_control<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
    ) -> Option<(&Locator, ElementHandle)> {
        for locator in &self.strategies {
            match driver.find(locator).await {
                Ok(Some(control)) => {
                    tracing::debug!("Load-more control resolved by {}", locator);
                    return Some((locator, control));
                }
                Ok(None) => tracing::debug!("Load-more strategy {} found nothing", locator),
                Err(e) => tracing::debug!("Load-more strategy {} failed: {}", locator, e),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::memory::MemoryPageDriver;

    const PAGE_ONE: &str = "https://jobs.test/list";
    const PAGE_TWO: &str = "https://jobs.test/list?page=2";

    fn advancer(strategies: Vec<Locator>) -> PaginationAdvancer {
        PaginationAdvancer::new(
            strategies,
            Locator::css("tbody tr"),
            Duration::from_millis(50),
            Duration::from_millis(1),
            Diagnostics::disabled(),
        )
    }

    fn listing(rows: usize, pager: &str) -> String {
        let rows: String = (0..rows)
            .map(|i| format!("<tr><td>{}</td></tr>", i))
            .collect();
        format!("<table><tbody>{}</tbody></table>{}", rows, pager)
    }

    #[tokio::test]
    async fn test_first_resolving_strategy_wins() {
        let mut driver = MemoryPageDriver::new()
            .with_page(
                PAGE_ONE,
                &listing(
                    2,
                    r#"<a class="next" href="?page=99">Weiter</a>
                       <button id="load-more" data-href="?page=2">Mehr laden</button>"#,
                ),
            )
            .with_page(PAGE_TWO, &listing(4, ""));
        driver.navigate(PAGE_ONE).await.unwrap();

        let advancer = advancer(vec![
            Locator::id("load-more"),
            Locator::class_pattern(Some("a"), "next"),
        ]);

        assert!(advancer.advance(&mut driver).await);
        assert_eq!(driver.current_url().as_deref(), Some(PAGE_TWO));
    }

    #[tokio::test]
    async fn test_no_control_is_exhaustion() {
        let mut driver = MemoryPageDriver::new().with_page(PAGE_ONE, &listing(2, ""));
        driver.navigate(PAGE_ONE).await.unwrap();

        assert!(!advancer(vec![Locator::id("load-more")]).advance(&mut driver).await);
    }

    #[tokio::test]
    async fn test_hidden_control_is_exhaustion() {
        let mut driver = MemoryPageDriver::new()
            .with_page(
                PAGE_ONE,
                &listing(2, r#"<button id="load-more" hidden data-href="?page=2">Mehr</button>"#),
            )
            .with_page(PAGE_TWO, &listing(4, ""));
        driver.navigate(PAGE_ONE).await.unwrap();

        assert!(!advancer(vec![Locator::id("load-more")]).advance(&mut driver).await);
        assert_eq!(driver.visits().len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_control_is_exhaustion() {
        let mut driver = MemoryPageDriver::new().with_page(
            PAGE_ONE,
            &listing(2, r#"<button id="load-more" disabled data-href="?page=2">Mehr</button>"#),
        );
        driver.navigate(PAGE_ONE).await.unwrap();

        assert!(!advancer(vec![Locator::id("load-more")]).advance(&mut driver).await);
    }

    #[tokio::test]
    async fn test_failed_click_is_exhaustion() {
        let mut driver = MemoryPageDriver::new()
            .with_page(
                PAGE_ONE,
                &listing(2, r#"<a id="load-more" href="?page=2">Mehr</a>"#),
            )
            .with_failing(PAGE_TWO);
        driver.navigate(PAGE_ONE).await.unwrap();

        assert!(!advancer(vec![Locator::id("load-more")]).advance(&mut driver).await);
    }

    #[tokio::test]
    async fn test_listing_that_never_settles_times_out() {
        let mut driver = MemoryPageDriver::new()
            .with_page(
                PAGE_ONE,
                &listing(2, r#"<a id="load-more" href="?page=2">Mehr</a>"#),
            )
            .with_page(PAGE_TWO, "<p>rows were removed</p>");
        driver.navigate(PAGE_ONE).await.unwrap();

        assert!(!advancer(vec![Locator::id("load-more")]).advance(&mut driver).await);
    }
}
