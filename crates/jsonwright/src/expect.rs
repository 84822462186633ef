//! Polling expectations.
//!
//! Every expectation re-reads the page until it holds or its timeout runs
//! out. Expiry is reported as [`JsonwrightError::AssertionFailed`] carrying
//! the last observed value.

use crate::driver::BrowserDriver;
use crate::locator::{Locator, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use crate::result::{JsonwrightError, JsonwrightResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Collapse whitespace runs and trim
#[must_use]
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Timing for expectations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for ExpectOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl ExpectOptions {
    /// Create options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Override the timeout when one is given
    #[must_use]
    pub const fn with_timeout_opt(self, timeout_ms: Option<u64>) -> Self {
        match timeout_ms {
            Some(ms) => self.with_timeout(ms),
            None => self,
        }
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }
}

/// Outcome of one probe
enum Probe {
    Pass,
    Fail(String),
}

/// Expectations against one driver
pub struct Expect<'a> {
    driver: &'a dyn BrowserDriver,
    options: ExpectOptions,
}

impl std::fmt::Debug for Expect<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expect")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'a> Expect<'a> {
    /// Create an expectation set
    #[must_use]
    pub fn new(driver: &'a dyn BrowserDriver, options: ExpectOptions) -> Self {
        Self { driver, options }
    }

    async fn poll<F, Fut>(&self, what: String, mut probe: F) -> JsonwrightResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = JsonwrightResult<Probe>>,
    {
        let deadline = Instant::now() + Duration::from_millis(self.options.timeout_ms);
        let interval = Duration::from_millis(self.options.poll_interval_ms.max(1));
        let observed = loop {
            let seen = match probe().await {
                Ok(Probe::Pass) => {
                    debug!(expectation = %what, "expectation met");
                    return Ok(());
                }
                Ok(Probe::Fail(seen)) => seen,
                Err(err) => err.to_string(),
            };
            let now = Instant::now();
            if now >= deadline {
                break seen;
            }
            tokio::time::sleep(interval.min(deadline - now)).await;
        };
        Err(JsonwrightError::assertion(format!(
            "expected {what} within {}ms, last observed: {observed}",
            self.options.timeout_ms
        )))
    }

    /// Element text equals `expected` (whitespace-normalized)
    pub async fn to_have_text(&self, locator: &Locator, expected: &str) -> JsonwrightResult<()> {
        let want = normalize_whitespace(expected);
        self.poll(format!("{locator} to have text {expected:?}"), || async {
            let text = normalize_whitespace(&self.driver.text_content(locator).await?.unwrap_or_default());
            Ok(if text == want { Probe::Pass } else { Probe::Fail(format!("{text:?}")) })
        })
        .await
    }

    /// Element text contains `needle`
    pub async fn to_contain_text(&self, locator: &Locator, needle: &str) -> JsonwrightResult<()> {
        let want = normalize_whitespace(needle);
        self.poll(format!("{locator} to contain text {needle:?}"), || async {
            let text = normalize_whitespace(&self.driver.text_content(locator).await?.unwrap_or_default());
            Ok(if text.contains(&want) { Probe::Pass } else { Probe::Fail(format!("{text:?}")) })
        })
        .await
    }

    /// Element is rendered
    pub async fn to_be_visible(&self, locator: &Locator) -> JsonwrightResult<()> {
        self.poll(format!("{locator} to be visible"), || async {
            Ok(if self.driver.is_visible(locator).await? {
                Probe::Pass
            } else {
                Probe::Fail("hidden or detached".to_string())
            })
        })
        .await
    }

    /// Input value equals `expected`
    pub async fn to_have_value(&self, locator: &Locator, expected: &str) -> JsonwrightResult<()> {
        self.poll(format!("{locator} to have value {expected:?}"), || async {
            let value = self.driver.input_value(locator).await?;
            Ok(if value == expected { Probe::Pass } else { Probe::Fail(format!("{value:?}")) })
        })
        .await
    }

    /// Input value contains `needle`
    pub async fn to_contain_value(&self, locator: &Locator, needle: &str) -> JsonwrightResult<()> {
        self.poll(format!("{locator} value to contain {needle:?}"), || async {
            let value = self.driver.input_value(locator).await?;
            Ok(if value.contains(needle) { Probe::Pass } else { Probe::Fail(format!("{value:?}")) })
        })
        .await
    }

    /// Current location equals `expected`
    pub async fn url_to_be(&self, expected: &str) -> JsonwrightResult<()> {
        self.poll(format!("url to be {expected:?}"), || async {
            let url = self.driver.current_url().await?;
            Ok(if url == expected { Probe::Pass } else { Probe::Fail(url) })
        })
        .await
    }

    /// Current location contains `needle`
    pub async fn url_to_contain(&self, needle: &str) -> JsonwrightResult<()> {
        self.poll(format!("url to contain {needle:?}"), || async {
            let url = self.driver.current_url().await?;
            Ok(if url.contains(needle) { Probe::Pass } else { Probe::Fail(url) })
        })
        .await
    }

    /// Document text contains `needle`
    pub async fn body_to_contain(&self, needle: &str) -> JsonwrightResult<()> {
        let want = normalize_whitespace(needle);
        self.poll(format!("page to contain text {needle:?}"), || async {
            let body = normalize_whitespace(&self.driver.body_text().await?);
            Ok(if body.contains(&want) {
                Probe::Pass
            } else {
                Probe::Fail("text absent from page".to_string())
            })
        })
        .await
    }

    /// Some element with exactly `text` is visible
    pub async fn text_to_be_visible(&self, text: &str) -> JsonwrightResult<()> {
        let locator = Locator::page().text(normalize_whitespace(text));
        self.to_be_visible(&locator).await
    }
}
