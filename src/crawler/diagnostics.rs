use crate::driver::{DriverError, PageDriver};
use std::path::{Path, PathBuf};

/// Captures the current page when something goes wrong
///
/// Prefers a screenshot; backends that cannot take one get the page source
/// instead. Capture problems are logged and never propagate.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    dir: PathBuf,
    enabled: bool,
}

impl Diagnostics {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            enabled: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `<label>_<unix>.png`, or `<label>_<unix>.html` as a fallback
    pub async fn capture<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        label: &str,
    ) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }

        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            tracing::warn!(
                "Cannot create diagnostics directory {}: {}",
                self.dir.display(),
                e
            );
            return None;
        }

        let stem = format!("{}_{}", label, chrono::Utc::now().timestamp());

        let screenshot = self.dir.join(format!("{}.png", stem));
        match driver.screenshot(&screenshot).await {
            Ok(()) => {
                tracing::info!("Saved diagnostic screenshot {}", screenshot.display());
                return Some(screenshot);
            }
            Err(DriverError::Unsupported(_)) => {}
            Err(e) => tracing::debug!("Diagnostic screenshot failed: {}", e),
        }

        let source = self.dir.join(format!("{}.html", stem));
        let written = match driver.page_source().await {
            Ok(html) => std::fs::write(&source, html).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match written {
            Ok(()) => {
                tracing::info!("Saved diagnostic page source {}", source.display());
                Some(source)
            }
            Err(e) => {
                tracing::warn!("Diagnostic capture '{}' failed: {}", label, e);
                None
            }
        }
    }
}
