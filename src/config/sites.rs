//! Site profiles
//!
//! A profile is the full selector table for one listing site: where the
//! listing lives, how rows and their fields are found, how to load more rows
//! and where the detail content sits. Two profiles are built in; custom
//! profiles come from `[[site]]` tables in the configuration file.

use crate::config::types::Config;
use crate::driver::Locator;
use serde::Deserialize;
use url::Url;

/// Selector table for one listing site
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SiteProfile {
    /// Profile name used by `--site`
    pub name: String,

    /// Listing view URL
    #[serde(rename = "listing-url")]
    pub listing_url: String,

    /// Query parameter carrying the keyword filter, if the site has one
    #[serde(rename = "keyword-param", default)]
    pub keyword_param: Option<String>,

    /// Marker that the listing view has rendered
    #[serde(rename = "listing-ready")]
    pub listing_ready: Locator,

    /// Marker for an empty result page
    #[serde(rename = "no-results", default)]
    pub no_results: Option<Locator>,

    /// One match per listing row
    pub rows: Locator,

    /// Field locators, resolved within each row
    pub fields: RowFields,

    /// Direct detail address; `{id}` is replaced by the listing identifier
    #[serde(rename = "detail-url-template", default)]
    pub detail_url_template: Option<String>,

    /// Marker that a detail view has rendered
    #[serde(rename = "detail-ready", default)]
    pub detail_ready: Option<Locator>,

    /// "Load more" control strategies, in priority order
    #[serde(rename = "load-more", default)]
    pub load_more: Vec<Locator>,

    /// Detail content strategies, in priority order
    #[serde(default)]
    pub content: Vec<ContentStrategy>,

    /// Cookie consent buttons, in priority order
    #[serde(default)]
    pub consent: Vec<Locator>,
}

/// Per-row field locators
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RowFields {
    /// Identifier cell
    pub id: Locator,

    /// Read the identifier from this attribute instead of the cell text
    #[serde(rename = "id-attribute", default)]
    pub id_attribute: Option<String>,

    /// Regex applied to the raw identifier; the first capture group wins
    #[serde(rename = "id-pattern", default)]
    pub id_pattern: Option<String>,

    #[serde(default)]
    pub organization: Option<Locator>,

    #[serde(default)]
    pub title: Option<Locator>,

    /// Detail link within the row
    #[serde(default)]
    pub link: Option<Locator>,
}

/// One entry of the detail content table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContentStrategy {
    /// Name reported in logs
    pub label: String,

    pub locator: Locator,
}

impl ContentStrategy {
    pub fn new(label: &str, locator: Locator) -> Self {
        Self {
            label: label.to_string(),
            locator,
        }
    }
}

impl SiteProfile {
    /// Listing URL with the keyword filter applied
    ///
    /// Profiles without a keyword parameter ignore the keyword.
    pub fn listing_url_for(&self, keyword: Option<&str>) -> Result<String, url::ParseError> {
        let mut url = Url::parse(&self.listing_url)?;

        match (keyword.map(str::trim).filter(|k| !k.is_empty()), &self.keyword_param) {
            (Some(keyword), Some(param)) => {
                url.query_pairs_mut().append_pair(param, keyword);
            }
            (Some(keyword), None) => {
                tracing::warn!(
                    "Site '{}' has no keyword parameter, ignoring keyword '{}'",
                    self.name,
                    keyword
                );
            }
            (None, _) => {}
        }

        Ok(url.to_string())
    }

    /// Direct detail URL for an identifier, if the profile has a template
    pub fn detail_url(&self, id: &str) -> Option<String> {
        self.detail_url_template
            .as_ref()
            .map(|template| template.replace("{id}", id))
    }

    /// Every locator in the profile, paired with where it is used
    pub fn locators(&self) -> Vec<(&'static str, &Locator)> {
        let mut all = vec![
            ("listing-ready", &self.listing_ready),
            ("rows", &self.rows),
            ("fields.id", &self.fields.id),
        ];
        all.extend(self.no_results.iter().map(|l| ("no-results", l)));
        all.extend(self.fields.organization.iter().map(|l| ("fields.organization", l)));
        all.extend(self.fields.title.iter().map(|l| ("fields.title", l)));
        all.extend(self.fields.link.iter().map(|l| ("fields.link", l)));
        all.extend(self.detail_ready.iter().map(|l| ("detail-ready", l)));
        all.extend(self.load_more.iter().map(|l| ("load-more", l)));
        all.extend(self.content.iter().map(|s| ("content", &s.locator)));
        all.extend(self.consent.iter().map(|l| ("consent", l)));
        all
    }
}

/// Profile for interamt.de, the public-sector job board
pub fn interamt() -> SiteProfile {
    SiteProfile {
        name: "interamt".to_string(),
        listing_url: "https://interamt.de/koop/app/trefferliste".to_string(),
        keyword_param: None,
        listing_ready: Locator::css("tbody"),
        no_results: Some(Locator::text(Some("div"), "(?i)keine ergebnisse|no results")),
        rows: Locator::css("tbody tr"),
        fields: RowFields {
            id: Locator::css("td[data-field='StellenangebotId'] span"),
            id_attribute: None,
            id_pattern: None,
            organization: Some(Locator::css("td[data-field='Behoerde'] span")),
            title: Some(Locator::css("td[data-field='Stellenbezeichnung'] span")),
            link: None,
        },
        detail_url_template: Some("https://interamt.de/koop/app/stelle?id={id}".to_string()),
        detail_ready: None,
        load_more: vec![
            Locator::id("load-more"),
            Locator::class_pattern(None, "load-more"),
            Locator::text(Some("button"), "(?i)mehr laden"),
            Locator::text(Some("a"), "(?i)^mehr"),
        ],
        content: vec![
            ContentStrategy::new("richtext", Locator::css("div.richtext")),
            ContentStrategy::new("primary-tab", Locator::id("ia-tab-primary")),
            ContentStrategy::new(
                "description",
                Locator::class_pattern(Some("div"), "description"),
            ),
            ContentStrategy::new("main", Locator::css("div[role='main']")),
        ],
        consent: vec![
            Locator::css("button#cookie-consent-accept"),
            Locator::text(
                Some("button"),
                "(?i)^(accept|ok|agree|akzeptieren|zustimmen)",
            ),
        ],
    }
}

/// Profile for service.bund.de, the federal job portal
pub fn bund() -> SiteProfile {
    SiteProfile {
        name: "bund".to_string(),
        listing_url: "https://www.service.bund.de/Content/DE/Stellen/Suche/Formular.html"
            .to_string(),
        keyword_param: Some("templateQueryString".to_string()),
        listing_ready: Locator::css("ul.result-list"),
        no_results: Some(Locator::text(Some("p"), "(?i)keine treffer")),
        rows: Locator::css("ul.result-list li"),
        fields: RowFields {
            id: Locator::css("a[href]"),
            id_attribute: Some("href".to_string()),
            id_pattern: Some(r"/([^/?#]+?)(?:\.html?)?(?:[?#].*)?$".to_string()),
            organization: Some(Locator::css("div.aside p")),
            title: Some(Locator::css("h3")),
            link: Some(Locator::css("a[href]")),
        },
        detail_url_template: None,
        detail_ready: Some(Locator::css("div.text")),
        load_more: vec![
            Locator::class_pattern(Some("a"), "next"),
            Locator::text(Some("a"), "(?i)weiter|nächste"),
        ],
        content: vec![
            ContentStrategy::new("body-section", Locator::css("div.text section:nth-of-type(2)")),
            ContentStrategy::new("text", Locator::css("div.text")),
        ],
        consent: vec![Locator::text(
            Some("button"),
            "(?i)^(alle akzeptieren|akzeptieren|accept)",
        )],
    }
}

/// Every built-in profile
pub fn builtin_sites() -> Vec<SiteProfile> {
    vec![interamt(), bund()]
}

impl Config {
    /// Resolves a site profile by name
    ///
    /// Custom profiles shadow built-ins of the same name.
    pub fn site(&self, name: &str) -> Option<SiteProfile> {
        self.sites
            .iter()
            .find(|site| site.name == name)
            .cloned()
            .or_else(|| builtin_sites().into_iter().find(|site| site.name == name))
    }

    /// Names of every resolvable profile
    pub fn site_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sites.iter().map(|s| s.name.clone()).collect();
        for site in builtin_sites() {
            if !names.contains(&site.name) {
                names.push(site.name);
            }
        }
        names
    }
}
