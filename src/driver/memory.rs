//! In-memory page driver for unit tests
//!
//! Serves fixed HTML per URL and records every navigation so tests can
//! assert where the crawler went.

use crate::driver::dom::LoadedPage;
use crate::driver::{DriverError, DriverResult, ElementHandle, Locator, PageDriver};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

#[derive(Debug, Default)]
pub struct Recorded {
    pub visits: Vec<String>,
    pub screenshots: Vec<PathBuf>,
    pub closed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPageDriver {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
    slow: HashSet<String>,
    stale_text: Option<String>,
    page: Option<LoadedPage>,
    epoch: u64,
    recorded: Arc<Mutex<Recorded>>,
}

fn key(url: &str) -> String {
    Url::parse(url)
        .map(|parsed| parsed.to_string())
        .unwrap_or_else(|_| url.to_string())
}

impl MemoryPageDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(key(url), html.to_string());
        self
    }

    /// Navigation to this URL fails with a navigation error
    pub fn with_failing(mut self, url: &str) -> Self {
        self.failing.insert(key(url));
        self
    }

    /// Navigation to this URL fails with a timeout
    pub fn with_timeout(mut self, url: &str) -> Self {
        self.slow.insert(key(url));
        self
    }

    /// Reading the text of an element containing `fragment` fails as stale
    pub fn with_stale_text(mut self, fragment: &str) -> Self {
        self.stale_text = Some(fragment.to_string());
        self
    }

    pub fn recorded(&self) -> Arc<Mutex<Recorded>> {
        Arc::clone(&self.recorded)
    }

    pub fn visits(&self) -> Vec<String> {
        self.recorded.lock().unwrap().visits.clone()
    }

    fn loaded(&self) -> DriverResult<&LoadedPage> {
        self.page.as_ref().ok_or(DriverError::NoPage)
    }

    fn loaded_mut(&mut self) -> DriverResult<&mut LoadedPage> {
        self.page.as_mut().ok_or(DriverError::NoPage)
    }
}

#[async_trait]
impl PageDriver for MemoryPageDriver {
    async fn navigate(&mut self, url: &str) -> DriverResult<()> {
        let url = key(url);
        self.recorded.lock().unwrap().visits.push(url.clone());

        if self.slow.contains(&url) {
            return Err(DriverError::Timeout {
                what: url,
                timeout: Duration::from_secs(30),
            });
        }
        if self.failing.contains(&url) {
            return Err(DriverError::Navigation {
                url,
                message: "connection reset".to_string(),
            });
        }

        let html = self.pages.get(&url).cloned().ok_or_else(|| DriverError::Navigation {
            url: url.clone(),
            message: "HTTP 404".to_string(),
        })?;
        let parsed = Url::parse(&url).map_err(|e| DriverError::Navigation {
            url: url.clone(),
            message: e.to_string(),
        })?;

        self.epoch += 1;
        self.page = Some(LoadedPage::new(parsed, html, self.epoch));
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
        let text = self.loaded()?.element(element)?.text.clone();
        match &self.stale_text {
            Some(fragment) if text.contains(fragment.as_str()) => Err(DriverError::StaleElement),
            _ => Ok(text),
        }
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
        let target = self.loaded()?.element(element)?.link.clone();
        match target {
            Some(url) => self.navigate(&url).await,
            None => Err(DriverError::NotInteractable("no link target".to_string())),
        }
    }

    async fn page_source(&mut self) -> DriverResult<String> {
        Ok(self.loaded()?.html().to_string())
    }

    async fn screenshot(&mut self, path: &Path) -> DriverResult<()> {
        self.recorded
            .lock()
            .unwrap()
            .screenshots
            .push(path.to_path_buf());
        Ok(())
    }

    async fn resize_viewport(&mut self, _width: u32, _height: u32) -> DriverResult<()> {
        Ok(())
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.recorded.lock().unwrap().closed = true;
        self.page = None;
        Ok(())
    }
}
