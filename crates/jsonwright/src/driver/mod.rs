//! Browser capability interface.
//!
//! The executor never talks to a browser directly: every interaction goes
//! through [`BrowserDriver`], which operates on lazily-resolved
//! [`Locator`] chains. Two implementations ship with the crate:
//!
//! - [`mock::MockDriver`]: in-memory document with call history, for tests
//! - `chromium::ChromiumDriver`: Chrome `DevTools` Protocol via chromiumoxide
//!   (`browser` feature)
//!
//! A [`DriverFactory`] opens one session per suite.

#[cfg(feature = "browser")]
pub mod chromium;
pub mod mock;
pub mod script;

use crate::locator::Locator;
use crate::network::{NetworkResponse, ResponseMatcher, RouteRule};
use crate::result::{JsonwrightError, JsonwrightResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Click behavior
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickOptions {
    /// Skip actionability checks and dispatch the click directly
    pub force: bool,
}

impl ClickOptions {
    /// Forced click
    #[must_use]
    pub const fn forced() -> Self {
        Self { force: true }
    }
}

/// Which `<option>` entries to select
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectOption {
    /// Match on the `value` attribute
    Values(Vec<String>),
    /// Match on the visible label
    Labels(Vec<String>),
    /// Match on zero-based position
    Indexes(Vec<usize>),
}

/// `window.scrollTo` behavior
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBehavior {
    /// Browser default
    #[default]
    Auto,
    /// Animated
    Smooth,
    /// Jump
    Instant,
}

impl ScrollBehavior {
    /// Name used by the DOM API
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Smooth => "smooth",
            Self::Instant => "instant",
        }
    }
}

impl FromStr for ScrollBehavior {
    type Err = JsonwrightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "smooth" => Ok(Self::Smooth),
            "instant" => Ok(Self::Instant),
            other => Err(JsonwrightError::config(format!(
                "scrollTo behavior must be auto, smooth or instant (got '{other}')"
            ))),
        }
    }
}

/// Page-level scroll request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageScroll {
    /// Scroll to the top of the document
    Top,
    /// Scroll to the bottom of the document
    Bottom,
    /// Scroll to coordinates; missing axes keep their current offset
    To {
        /// Horizontal offset
        x: Option<f64>,
        /// Vertical offset
        y: Option<f64>,
        /// Scroll behavior
        behavior: ScrollBehavior,
    },
}

impl fmt::Display for PageScroll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Top => f.write_str("top"),
            Self::Bottom => f.write_str("bottom"),
            Self::To { x, y, behavior } => {
                write!(f, "x={x:?} y={y:?} behavior={}", behavior.as_str())
            }
        }
    }
}

/// Browser configuration for the CDP driver
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// Timeout for navigation
    pub navigation_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: None,
            sandbox: true,
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

impl BrowserConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Set navigation timeout
    #[must_use]
    pub const fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }
}

/// Capabilities the executor needs from a browser session.
///
/// Element operations act on the first element the locator resolves to and
/// fail with [`JsonwrightError::Driver`] when it resolves to nothing.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigate the page
    async fn navigate(&self, url: &str) -> JsonwrightResult<()>;

    /// Current location
    async fn current_url(&self) -> JsonwrightResult<String>;

    /// Number of elements the locator resolves to
    async fn count(&self, locator: &Locator) -> JsonwrightResult<usize>;

    /// Click an element
    async fn click(&self, locator: &Locator, options: ClickOptions) -> JsonwrightResult<()>;

    /// Move the pointer over an element
    async fn hover(&self, locator: &Locator) -> JsonwrightResult<()>;

    /// Replace the value of an input
    async fn fill(&self, locator: &Locator, text: &str) -> JsonwrightResult<()>;

    /// Type text one character at a time
    async fn type_text(&self, locator: &Locator, text: &str, delay: Duration)
        -> JsonwrightResult<()>;

    /// Press a key chord such as `Enter` or `Control+A`, on an element or
    /// the focused document
    async fn press(&self, locator: Option<&Locator>, key: &str) -> JsonwrightResult<()>;

    /// Check or uncheck a checkbox/radio
    async fn set_checked(&self, locator: &Locator, checked: bool) -> JsonwrightResult<()>;

    /// Select options of a `<select>`; returns the selected values
    async fn select_option(
        &self,
        locator: &Locator,
        option: &SelectOption,
    ) -> JsonwrightResult<Vec<String>>;

    /// Attach files to a file input
    async fn set_input_files(&self, locator: &Locator, files: &[PathBuf]) -> JsonwrightResult<()>;

    /// Text content of an element
    async fn text_content(&self, locator: &Locator) -> JsonwrightResult<Option<String>>;

    /// Current value of an input
    async fn input_value(&self, locator: &Locator) -> JsonwrightResult<String>;

    /// Attribute value
    async fn get_attribute(&self, locator: &Locator, name: &str)
        -> JsonwrightResult<Option<String>>;

    /// Lowercased node name
    async fn tag_name(&self, locator: &Locator) -> JsonwrightResult<String>;

    /// Number of files attached to a file input
    async fn file_count(&self, locator: &Locator) -> JsonwrightResult<usize>;

    /// Whether the element is rendered with a non-empty box
    async fn is_visible(&self, locator: &Locator) -> JsonwrightResult<bool>;

    /// Scroll an element into view
    async fn scroll_into_view(&self, locator: &Locator) -> JsonwrightResult<()>;

    /// Scroll the page
    async fn scroll_page(&self, scroll: &PageScroll) -> JsonwrightResult<()>;

    /// PNG screenshot of an element, or of the page when `locator` is `None`
    async fn screenshot(&self, locator: Option<&Locator>, full_page: bool)
        -> JsonwrightResult<Vec<u8>>;

    /// Visible text of the whole document
    async fn body_text(&self) -> JsonwrightResult<String>;

    /// Wait for the next response whose URL and status satisfy `matcher`.
    /// The body is read only when the matcher has a body condition; checking
    /// it is left to the caller.
    async fn wait_for_response(
        &self,
        matcher: &ResponseMatcher,
        timeout: Duration,
    ) -> JsonwrightResult<NetworkResponse>;

    /// Register an interception rule
    async fn route(&self, rule: RouteRule) -> JsonwrightResult<()>;

    /// Remove interception rules registered with `pattern`
    async fn unroute(&self, pattern: &str) -> JsonwrightResult<()>;

    /// End the session
    async fn close(&self) -> JsonwrightResult<()>;
}

/// Opens one browser session per suite
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// Open a fresh session
    async fn open(&self) -> JsonwrightResult<Arc<dyn BrowserDriver>>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_config_builders() {
        let config = BrowserConfig::new()
            .with_viewport(800, 600)
            .with_headless(false)
            .with_no_sandbox()
            .with_chromium_path("/usr/bin/chromium");
        assert_eq!(config.viewport_width, 800);
        assert!(!config.headless);
        assert!(!config.sandbox);
        assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
        assert_eq!(config.navigation_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_scroll_behavior_parse() {
        assert_eq!("smooth".parse::<ScrollBehavior>().unwrap(), ScrollBehavior::Smooth);
        assert!("fast".parse::<ScrollBehavior>().unwrap_err().is_config());
        assert_eq!(PageScroll::Top.to_string(), "top");
    }

    #[test]
    fn test_forced_click() {
        assert!(ClickOptions::forced().force);
        assert!(!ClickOptions::default().force);
    }
}
