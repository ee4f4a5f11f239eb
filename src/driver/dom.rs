//! DOM snapshot shared by HTML-backed drivers
//!
//! A [`LoadedPage`] keeps the raw HTML of one page load and a registry of the
//! elements handed out so far. Lookups re-parse the document, which keeps the
//! type `Send` (scraper's tree is not) at the cost of some CPU per query.

use crate::driver::{DriverError, DriverResult, ElementHandle, Locator};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Everything captured about an element at lookup time
#[derive(Debug, Clone)]
pub struct ElementSnapshot {
    /// Child-index path from the document root
    path: Vec<usize>,
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub html: String,
    pub visible: bool,
    pub enabled: bool,
    /// Absolute URL a click on this element leads to
    pub link: Option<String>,
}

impl ElementSnapshot {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// One loaded page plus the elements looked up on it
#[derive(Debug, Clone)]
pub struct LoadedPage {
    url: Url,
    html: String,
    epoch: u64,
    elements: Vec<ElementSnapshot>,
}

impl LoadedPage {
    pub fn new(url: Url, html: String, epoch: u64) -> Self {
        Self {
            url,
            html,
            epoch,
            elements: Vec::new(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Finds every element in the document matching the locator
    pub fn find_all(&mut self, locator: &Locator) -> DriverResult<Vec<ElementHandle>> {
        let matcher = Matcher::compile(locator)?;
        let document = Html::parse_document(&self.html);
        let found: Vec<ElementSnapshot> = matcher
            .select(document.root_element(), false)
            .into_iter()
            .map(|element| snapshot(element, &self.url))
            .collect();
        Ok(self.register(found))
    }

    /// Finds every descendant of `parent` matching the locator
    pub fn find_all_within(
        &mut self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> DriverResult<Vec<ElementHandle>> {
        let path = self.element(parent)?.path.clone();
        let matcher = Matcher::compile(locator)?;
        let document = Html::parse_document(&self.html);
        let root = resolve(&document, &path).ok_or(DriverError::StaleElement)?;
        let found: Vec<ElementSnapshot> = matcher
            .select(root, true)
            .into_iter()
            .map(|element| snapshot(element, &self.url))
            .collect();
        Ok(self.register(found))
    }

    /// Returns the snapshot behind a handle issued by this page
    pub fn element(&self, handle: &ElementHandle) -> DriverResult<&ElementSnapshot> {
        if handle.epoch() != self.epoch {
            return Err(DriverError::StaleElement);
        }
        self.elements
            .get(handle.index())
            .ok_or(DriverError::StaleElement)
    }

    fn register(&mut self, found: Vec<ElementSnapshot>) -> Vec<ElementHandle> {
        let start = self.elements.len();
        self.elements.extend(found);
        (start..self.elements.len())
            .map(|index| ElementHandle::new(self.epoch, index))
            .collect()
    }
}

/// Compiled form of a [`Locator`]
enum Matcher {
    Css(Selector),
    Class { scope: Selector, pattern: Regex },
    Text { scope: Selector, pattern: Regex },
}

impl Matcher {
    fn compile(locator: &Locator) -> DriverResult<Self> {
        let invalid = |message: String| DriverError::InvalidLocator {
            locator: locator.to_string(),
            message,
        };

        match locator {
            Locator::Id { value } => {
                let css = format!("[id=\"{}\"]", value.replace('"', "\\\""));
                Ok(Self::Css(parse_selector(&css).map_err(invalid)?))
            }
            Locator::Css { value } => Ok(Self::Css(parse_selector(value).map_err(invalid)?)),
            Locator::ClassPattern { tag, pattern } => Ok(Self::Class {
                scope: parse_selector(tag.as_deref().unwrap_or("*")).map_err(&invalid)?,
                pattern: Regex::new(pattern).map_err(|e| invalid(e.to_string()))?,
            }),
            Locator::Text { tag, pattern } => Ok(Self::Text {
                scope: parse_selector(tag.as_deref().unwrap_or("*")).map_err(&invalid)?,
                pattern: Regex::new(pattern).map_err(|e| invalid(e.to_string()))?,
            }),
        }
    }

    fn scope(&self) -> &Selector {
        match self {
            Self::Css(selector) => selector,
            Self::Class { scope, .. } | Self::Text { scope, .. } => scope,
        }
    }

    fn select<'a>(&self, root: ElementRef<'a>, descendants_only: bool) -> Vec<ElementRef<'a>> {
        let candidates = root
            .select(self.scope())
            .filter(|element| !descendants_only || (**element).id() != (*root).id());

        match self {
            Self::Css(_) => candidates.collect(),
            Self::Class { pattern, .. } => candidates
                .filter(|element| {
                    element
                        .value()
                        .attr("class")
                        .map(|class| pattern.is_match(class))
                        .unwrap_or(false)
                })
                .collect(),
            Self::Text { pattern, .. } => {
                let matches: Vec<ElementRef<'a>> = candidates
                    .filter(|element| pattern.is_match(&normalized_text(*element)))
                    .collect();
                // Ancestors of a match contain the same text; keep the innermost.
                matches
                    .iter()
                    .copied()
                    .filter(|candidate| {
                        let candidate_id = (**candidate).id();
                        !matches.iter().any(|other| {
                            (**other).id() != candidate_id
                                && other.ancestors().any(|node| node.id() == candidate_id)
                        })
                    })
                    .collect()
            }
        }
    }
}

fn parse_selector(css: &str) -> Result<Selector, String> {
    Selector::parse(css).map_err(|e| e.to_string())
}

fn snapshot(element: ElementRef<'_>, base_url: &Url) -> ElementSnapshot {
    let value = element.value();
    ElementSnapshot {
        path: element_path(element),
        tag: value.name().to_string(),
        attributes: value
            .attrs()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        text: normalized_text(element),
        html: element.html(),
        visible: is_visible(element),
        enabled: value.attr("disabled").is_none()
            && value.attr("aria-disabled") != Some("true"),
        link: click_target(element, base_url),
    }
}

/// Joins text nodes and collapses whitespace runs
pub(crate) fn normalized_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn element_path(element: ElementRef<'_>) -> Vec<usize> {
    let mut path = Vec::new();
    let mut current = *element;
    while let Some(parent) = current.parent() {
        let index = parent
            .children()
            .position(|child| child.id() == current.id())
            .unwrap_or_default();
        path.push(index);
        current = parent;
    }
    path.reverse();
    path
}

fn resolve<'a>(document: &'a Html, path: &[usize]) -> Option<ElementRef<'a>> {
    let mut node = document.tree.root();
    for &index in path {
        node = node.children().nth(index)?;
    }
    ElementRef::wrap(node)
}

/// An element is hidden if it or any ancestor is hidden by attribute or inline style
fn is_visible(element: ElementRef<'_>) -> bool {
    let hidden = |element: ElementRef<'_>| {
        let value = element.value();
        if value.attr("hidden").is_some() {
            return true;
        }
        if value.name() == "input" && value.attr("type") == Some("hidden") {
            return true;
        }
        value
            .attr("style")
            .map(|style| {
                let style: String = style
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect::<String>()
                    .to_ascii_lowercase();
                style.contains("display:none") || style.contains("visibility:hidden")
            })
            .unwrap_or(false)
    };

    if hidden(element) {
        return false;
    }
    !element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(hidden)
}

/// Resolves where a click on the element navigates to
///
/// Uses the element's own `href` or `data-href`, else its first descendant link.
fn click_target(element: ElementRef<'_>, base_url: &Url) -> Option<String> {
    let own = element
        .value()
        .attr("href")
        .or_else(|| element.value().attr("data-href"));

    let href = match own {
        Some(href) => href.to_string(),
        None => {
            let selector = Selector::parse("a[href]").ok()?;
            element
                .select(&selector)
                .next()?
                .value()
                .attr("href")?
                .to_string()
        }
    };

    resolve_link(&href, base_url)
}

/// Resolves a link href to an absolute http(s) URL
///
/// Returns None for empty hrefs, fragment-only links and
/// `javascript:`, `mailto:`, `tel:` or `data:` targets.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
