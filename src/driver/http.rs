//! HTTP page driver
//!
//! Loads pages with a plain HTTP client and answers element queries from the
//! returned HTML. This covers server-rendered listing sites where "load more"
//! and row activation are ordinary links:
//! - Clicking an element follows its `href`, `data-href` or first inner link
//! - Elements without a link target are not interactable
//! - Screenshots are unsupported; diagnostics fall back to page source

use crate::config::{SessionConfig, TimeoutConfig, UserAgentConfig};
use crate::driver::dom::LoadedPage;
use crate::driver::{DriverError, DriverResult, ElementHandle, Locator, PageDriver};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::path::Path;
use std::time::Duration;

/// Page driver backed by `reqwest` and `scraper`
pub struct HttpPageDriver {
    client: Client,
    page: Option<LoadedPage>,
    epoch: u64,
    viewport: (u32, u32),
    page_load_timeout: Duration,
}

impl HttpPageDriver {
    /// Builds the HTTP session
    ///
    /// # Example
    ///
    /// ```no_run
    /// use listing_sweep::config::Config;
    /// use listing_sweep::driver::HttpPageDriver;
    ///
    /// let config = Config::default();
    /// let driver = HttpPageDriver::new(&config.session, &config.user_agent, &config.timeouts).unwrap();
    /// ```
    pub fn new(
        session: &SessionConfig,
        user_agent: &UserAgentConfig,
        timeouts: &TimeoutConfig,
    ) -> DriverResult<Self> {
        let client = build_http_client(session, user_agent, timeouts)
            .map_err(|e| DriverError::Session(e.to_string()))?;

        Ok(Self {
            client,
            page: None,
            epoch: 0,
            viewport: (session.viewport_width, session.viewport_height),
            page_load_timeout: timeouts.page_load(),
        })
    }

    /// Current viewport size (width, height)
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    fn loaded(&self) -> DriverResult<&LoadedPage> {
        self.page.as_ref().ok_or(DriverError::NoPage)
    }

    fn loaded_mut(&mut self) -> DriverResult<&mut LoadedPage> {
        self.page.as_mut().ok_or(DriverError::NoPage)
    }
}

/// Builds an HTTP client with the configured identity and timeouts
pub fn build_http_client(
    session: &SessionConfig,
    user_agent: &UserAgentConfig,
    timeouts: &TimeoutConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeouts.page_load())
        .connect_timeout(timeouts.element_wait())
        .redirect(Policy::limited(10))
        .danger_accept_invalid_certs(session.accept_invalid_certs)
        .gzip(true)
        .brotli(true)
        .build()
}

#[async_trait]
impl PageDriver for HttpPageDriver {
    async fn navigate(&mut self, url: &str) -> DriverResult<()> {
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                DriverError::Timeout {
                    what: format!("page load of {}", url),
                    timeout: self.page_load_timeout,
                }
            } else {
                DriverError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DriverError::Navigation {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                DriverError::Timeout {
                    what: format!("body of {}", url),
                    timeout: self.page_load_timeout,
                }
            } else {
                DriverError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        self.epoch += 1;
        self.page = Some(LoadedPage::new(final_url, body, self.epoch));
        Ok(())
    }

    async fn is_ready(&mut self) -> DriverResult<bool> {
        Ok(self.page.is_some())
    }

    fn current_url(&self) -> Option<String> {
        self.page.as_ref().map(|page| page.url().to_string())
    }

    async fn find_all(&mut self, locator: &Locator) -> DriverResult<Vec<ElementHandle>> {
        self.loaded_mut()?.find_all(locator)
    }

    async fn find_all_within(
        &mut self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> DriverResult<Vec<ElementHandle>> {
        self.loaded_mut()?.find_all_within(parent, locator)
    }

    async fn text(&mut self, element: &ElementHandle) -> DriverResult<String> {
        Ok(self.loaded()?.element(element)?.text.clone())
    }

    async fn html(&mut self, element: &ElementHandle) -> DriverResult<String> {
        Ok(self.loaded()?.element(element)?.html.clone())
    }

    async fn attribute(
        &mut self,
        element: &ElementHandle,
        name: &str,
    ) -> DriverResult<Option<String>> {
        Ok(self
            .loaded()?
            .element(element)?
            .attribute(name)
            .map(str::to_string))
    }

    async fn is_visible(&mut self, element: &ElementHandle) -> DriverResult<bool> {
        Ok(self.loaded()?.element(element)?.visible)
    }

    async fn is_enabled(&mut self, element: &ElementHandle) -> DriverResult<bool> {
        Ok(self.loaded()?.element(element)?.enabled)
    }

    async fn click(&mut self, element: &ElementHandle) -> DriverResult<()> {
        let snapshot = self.loaded()?.element(element)?;
        if !snapshot.visible || !snapshot.enabled {
            return Err(DriverError::NotInteractable(format!(
                "<{}> is hidden or disabled",
                snapshot.tag
            )));
        }

        let target = snapshot.link.clone().ok_or_else(|| {
            DriverError::NotInteractable(format!("<{}> has no link target", snapshot.tag))
        })?;
        self.navigate(&target).await
    }

    async fn page_source(&mut self) -> DriverResult<String> {
        Ok(self.loaded()?.html().to_string())
    }

    async fn screenshot(&mut self, _path: &Path) -> DriverResult<()> {
        Err(DriverError::Unsupported("screenshot"))
    }

    async fn resize_viewport(&mut self, width: u32, height: u32) -> DriverResult<()> {
        self.viewport = (width, height);
        Ok(())
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.page = None;
        Ok(())
    }
}
