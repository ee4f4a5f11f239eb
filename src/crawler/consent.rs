use crate::driver::{Locator, PageDriver};

/// Clicks the first visible cookie-consent control, if any
///
/// Returns true when a control was clicked. Nothing here is fatal: a banner
/// that cannot be dismissed is logged and the crawl carries on.
pub async fn dismiss_consent<D: PageDriver + ?Sized>(driver: &mut D, strategies: &[Locator]) -> bool {
    for locator in strategies {
        let element = match driver.find(locator).await {
            Ok(Some(element)) => element,
            Ok(None) => continue,
            Err(e) => {
                tracing::debug!("Consent probe {} failed: {}", locator, e);
                continue;
            }
        };

        if !driver.is_visible(&element).await.unwrap_or(false) {
            continue;
        }

        match driver.click(&element).await {
            Ok(()) => {
                tracing::info!("Dismissed cookie consent via {}", locator);
                return true;
            }
            Err(e) => tracing::debug!("Consent click on {} failed: {}", locator, e),
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::memory::MemoryPageDriver;

    #[tokio::test]
    async fn test_dismisses_first_clickable_control() {
        let mut driver = MemoryPageDriver::new()
            .with_page(
                "https://jobs.test/list",
                r#"<div id="banner">
                     <button style="display:none" data-href="/hidden">Accept</button>
                     <a href="/list?consent=1">Zustimmen</a>
                   </div>"#,
            )
            .with_page("https://jobs.test/list?consent=1", "<table></table>");
        driver.navigate("https://jobs.test/list").await.unwrap();

        let strategies = vec![
            Locator::id("cookie-accept"),
            Locator::text(Some("button"), "(?i)accept"),
            Locator::text(Some("a"), "(?i)zustimmen"),
        ];

        assert!(dismiss_consent(&mut driver, &strategies).await);
        assert_eq!(
            driver.visits().last().map(String::as_str),
            Some("https://jobs.test/list?consent=1")
        );
    }

    #[tokio::test]
    async fn test_no_banner() {
        let mut driver = MemoryPageDriver::new().with_page("https://jobs.test/", "<p>jobs</p>");
        driver.navigate("https://jobs.test/").await.unwrap();
        assert!(!dismiss_consent(&mut driver, &[Locator::css("button.consent")]).await);
    }
}
