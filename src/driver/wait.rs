//! Condition waits over a [`PageDriver`]
//!
//! Every wait is bounded. Running out of time yields
//! [`DriverError::Timeout`], which callers treat as a recoverable outcome.

use crate::driver::{DriverError, DriverResult, Locator, PageDriver};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// A page state to wait for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// The page reports it has finished loading
    Ready,

    /// At least one element matches the locator
    Present(Locator),

    /// At least one of the locators matches
    AnyPresent(Vec<Locator>),

    /// The locator matches a non-zero number of elements and that number did
    /// not change between two consecutive polls
    Stable(Locator),
}

impl Condition {
    fn describe(&self) -> String {
        match self {
            Self::Ready => "page ready".to_string(),
            Self::Present(locator) => format!("{} to be present", locator),
            Self::AnyPresent(locators) => format!(
                "any of [{}] to be present",
                locators
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Stable(locator) => format!("{} to settle", locator),
        }
    }
}

/// Polls the driver until the condition holds or the timeout elapses
///
/// Driver errors while probing count as "not yet", except an invalid locator,
/// which can never succeed and is returned immediately.
pub async fn wait_until<D: PageDriver + ?Sized>(
    driver: &mut D,
    condition: &Condition,
    timeout: Duration,
    poll_interval: Duration,
) -> DriverResult<()> {
    let deadline = Instant::now() + timeout;
    let mut last_count: Option<usize> = None;

    loop {
        let satisfied = match probe(driver, condition, &mut last_count).await {
            Ok(satisfied) => satisfied,
            Err(e @ DriverError::InvalidLocator { .. }) => return Err(e),
            Err(e) => {
                tracing::trace!("Probe for {} failed: {}", condition.describe(), e);
                false
            }
        };

        if satisfied {
            return Ok(());
        }

        if Instant::now() >= deadline {
            return Err(DriverError::Timeout {
                what: condition.describe(),
                timeout,
            });
        }

        tokio::time::sleep(poll_interval).await;
    }
}

async fn probe<D: PageDriver + ?Sized>(
    driver: &mut D,
    condition: &Condition,
    last_count: &mut Option<usize>,
) -> DriverResult<bool> {
    match condition {
        Condition::Ready => driver.is_ready().await,
        Condition::Present(locator) => Ok(driver.find(locator).await?.is_some()),
        Condition::AnyPresent(locators) => {
            for locator in locators {
                if driver.find(locator).await?.is_some() {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Condition::Stable(locator) => {
            let count = driver.find_all(locator).await?.len();
            let settled = count > 0 && *last_count == Some(count);
            *last_count = Some(count);
            Ok(settled)
        }
    }
}

/// Runs a driver future under a deadline
///
/// The driver's own timeout should normally fire first; this is the outer
/// bound for backends that hang without one.
pub async fn bounded<T, F>(timeout: Duration, what: &str, future: F) -> DriverResult<T>
where
    F: Future<Output = DriverResult<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(DriverError::Timeout {
            what: what.to_string(),
            timeout,
        }),
    }
}
