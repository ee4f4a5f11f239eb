//! Page driver abstraction
//!
//! The crawler never talks to a browser or HTTP client directly. Everything
//! it does to a page goes through the [`PageDriver`] trait:
//! - Navigation and readiness checks
//! - Element lookup by [`Locator`] (page-wide or within a parent element)
//! - Reading element text, HTML and attributes
//! - Clicking, screenshots and viewport sizing
//!
//! [`HttpPageDriver`] is the bundled backend for server-rendered pages.

mod dom;
mod http;
mod locator;
#[cfg(test)]
pub(crate) mod memory;
mod wait;

pub use dom::{ElementSnapshot, LoadedPage};
pub use http::HttpPageDriver;
pub use locator::Locator;
pub use wait::{bounded, wait_until, Condition};

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by page driver operations
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Timed out after {timeout:?} waiting for {what}")]
    Timeout { what: String, timeout: Duration },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Element is not interactable: {0}")]
    NotInteractable(String),

    #[error("Element handle is stale (page changed since lookup)")]
    StaleElement,

    #[error("No page loaded")]
    NoPage,

    #[error("Invalid locator {locator}: {message}")]
    InvalidLocator { locator: String, message: String },

    #[error("Operation not supported by this driver: {0}")]
    Unsupported(&'static str),

    #[error("Failed to start driver session: {0}")]
    Session(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for page driver operations
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Opaque reference to an element found on the current page
///
/// A handle is only valid for the page load it was found on. Drivers bump the
/// epoch on every navigation and reject handles from earlier epochs with
/// [`DriverError::StaleElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    epoch: u64,
    index: usize,
}

impl ElementHandle {
    pub fn new(epoch: u64, index: usize) -> Self {
        Self { epoch, index }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Capability set the crawler needs from a page automation backend
///
/// All operations are sequential on a single session. Implementations are
/// expected to bound every network-facing call with their configured timeout
/// and report it as [`DriverError::Timeout`].
#[async_trait]
pub trait PageDriver: Send {
    /// Loads the given URL, replacing the current page
    async fn navigate(&mut self, url: &str) -> DriverResult<()>;

    /// Returns true once the current page has finished loading
    async fn is_ready(&mut self) -> DriverResult<bool>;

    /// URL of the current page, if any
    fn current_url(&self) -> Option<String>;

    /// Finds every element matching the locator, in document order
    async fn find_all(&mut self, locator: &Locator) -> DriverResult<Vec<ElementHandle>>;

    /// Finds every descendant of `parent` matching the locator
    async fn find_all_within(
        &mut self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> DriverResult<Vec<ElementHandle>>;

    /// Finds the first element matching the locator
    async fn find(&mut self, locator: &Locator) -> DriverResult<Option<ElementHandle>> {
        Ok(self.find_all(locator).await?.into_iter().next())
    }

    /// Finds the first descendant of `parent` matching the locator
    async fn find_within(
        &mut self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> DriverResult<Option<ElementHandle>> {
        Ok(self
            .find_all_within(parent, locator)
            .await?
            .into_iter()
            .next())
    }

    /// Visible text of the element, whitespace normalized
    async fn text(&mut self, element: &ElementHandle) -> DriverResult<String>;

    /// Outer HTML of the element
    async fn html(&mut self, element: &ElementHandle) -> DriverResult<String>;

    async fn attribute(
        &mut self,
        element: &ElementHandle,
        name: &str,
    ) -> DriverResult<Option<String>>;

    async fn is_visible(&mut self, element: &ElementHandle) -> DriverResult<bool>;

    async fn is_enabled(&mut self, element: &ElementHandle) -> DriverResult<bool>;

    async fn click(&mut self, element: &ElementHandle) -> DriverResult<()>;

    /// Full source of the current page
    async fn page_source(&mut self) -> DriverResult<String>;

    /// Saves a PNG screenshot of the current page
    async fn screenshot(&mut self, path: &Path) -> DriverResult<()>;

    async fn resize_viewport(&mut self, width: u32, height: u32) -> DriverResult<()>;

    /// Releases the session. Further calls may fail.
    async fn close(&mut self) -> DriverResult<()>;
}
