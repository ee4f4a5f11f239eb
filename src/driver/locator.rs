use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How to find an element on a page
///
/// Site profiles list locators in priority order; callers use the first one
/// that resolves. In TOML a locator is written as a table tagged by `by`:
///
/// ```toml
/// load-more = [
///     { by = "id", value = "load-more" },
///     { by = "class-pattern", pattern = "load-more" },
///     { by = "text", tag = "button", pattern = "(?i)mehr laden" },
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "kebab-case")]
pub enum Locator {
    /// Element with this exact `id` attribute
    Id { value: String },

    /// CSS selector
    Css { value: String },

    /// Element whose `class` attribute matches a regex
    ClassPattern {
        #[serde(default)]
        tag: Option<String>,
        pattern: String,
    },

    /// Innermost element whose visible text matches a regex
    Text {
        #[serde(default)]
        tag: Option<String>,
        pattern: String,
    },
}

impl Locator {
    pub fn id(value: impl Into<String>) -> Self {
        Self::Id {
            value: value.into(),
        }
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self::Css {
            value: value.into(),
        }
    }

    pub fn class_pattern(tag: Option<&str>, pattern: impl Into<String>) -> Self {
        Self::ClassPattern {
            tag: tag.map(str::to_string),
            pattern: pattern.into(),
        }
    }

    pub fn text(tag: Option<&str>, pattern: impl Into<String>) -> Self {
        Self::Text {
            tag: tag.map(str::to_string),
            pattern: pattern.into(),
        }
    }

    /// Checks that the selector parses and the pattern compiles
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Id { value } if value.trim().is_empty() => Err("id cannot be empty".to_string()),
            Self::Id { .. } => Ok(()),
            Self::Css { value } => Selector::parse(value)
                .map(|_| ())
                .map_err(|e| format!("invalid CSS selector '{}': {}", value, e)),
            Self::ClassPattern { tag, pattern } | Self::Text { tag, pattern } => {
                if let Some(tag) = tag {
                    Selector::parse(tag)
                        .map_err(|e| format!("invalid tag '{}': {}", tag, e))?;
                }
                Regex::new(pattern)
                    .map(|_| ())
                    .map_err(|e| format!("invalid pattern '{}': {}", pattern, e))
            }
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id { value } => write!(f, "id={}", value),
            Self::Css { value } => write!(f, "css={}", value),
            Self::ClassPattern { tag, pattern } => {
                write!(f, "{}[class~/{}/]", tag.as_deref().unwrap_or("*"), pattern)
            }
            Self::Text { tag, pattern } => {
                write!(f, "{}[text~/{}/]", tag.as_deref().unwrap_or("*"), pattern)
            }
        }
    }
}
