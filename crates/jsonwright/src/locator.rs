//! Locator handles and target resolution.
//!
//! A [`Locator`] is a lazy description of where elements live: an ordered
//! chain of steps starting at the page (frame hops, structural selectors,
//! text matches, parent climbs, index picks). Nothing is resolved until a
//! driver is asked to count or act on it, so a locator is cheap to build and
//! is rebuilt for every action.

use crate::classify::{classify, TargetKind};
use crate::context::{ContextView, IndexStrategy};
use crate::driver::BrowserDriver;
use crate::result::{JsonwrightError, JsonwrightResult, Stage};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Default timeout for expectations (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default polling interval for expectations (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// One hop of a locator chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocatorStep {
    /// Enter the document of the matching frame element
    Frame(String),
    /// Structural selector, matched among descendants
    Css(String),
    /// Descendants whose visible text equals the string
    Text(String),
    /// Descendants of a tag whose visible text contains the string
    TagText {
        /// Lowercased tag name
        tag: String,
        /// Text to look for
        text: String,
    },
    /// Parent element of every current match
    Parent,
    /// Keep only the first match
    First,
    /// Keep only the last match
    Last,
    /// Keep only the n-th match (negative counts from the end)
    Nth(i64),
}

impl fmt::Display for LocatorStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame(s) => write!(f, "frame={s:?}"),
            Self::Css(s) => write!(f, "css={s:?}"),
            Self::Text(t) => write!(f, "text={t:?}"),
            Self::TagText { tag, text } => write!(f, "{tag}:has-text({text:?})"),
            Self::Parent => f.write_str(".."),
            Self::First => f.write_str("first"),
            Self::Last => f.write_str("last"),
            Self::Nth(n) => write!(f, "nth={n}"),
        }
    }
}

/// Lazily-resolved element handle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    steps: Vec<LocatorStep>,
}

impl Locator {
    /// The page root
    #[must_use]
    pub fn page() -> Self {
        Self::default()
    }

    /// Append a step
    #[must_use]
    pub fn then(mut self, step: LocatorStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Enter a frame
    #[must_use]
    pub fn frame(self, selector: impl Into<String>) -> Self {
        self.then(LocatorStep::Frame(selector.into()))
    }

    /// Narrow by selector
    #[must_use]
    pub fn css(self, selector: impl Into<String>) -> Self {
        self.then(LocatorStep::Css(selector.into()))
    }

    /// Narrow by exact visible text
    #[must_use]
    pub fn text(self, text: impl Into<String>) -> Self {
        self.then(LocatorStep::Text(text.into()))
    }

    /// Climb to the parent element
    #[must_use]
    pub fn parent(self) -> Self {
        self.then(LocatorStep::Parent)
    }

    /// Narrow to one occurrence
    #[must_use]
    pub fn nth(self, index: i64) -> Self {
        self.then(LocatorStep::Nth(index))
    }

    /// Narrow by a classified target
    #[must_use]
    pub fn target(self, kind: &TargetKind) -> Self {
        match kind {
            TargetKind::Selector(s) => self.css(s.clone()),
            TargetKind::Text(t) => self.text(t.clone()),
            TargetKind::TagText { tag, text } => self.then(LocatorStep::TagText {
                tag: tag.clone(),
                text: text.clone(),
            }),
        }
    }

    /// Apply an index strategy
    #[must_use]
    pub fn indexed(self, strategy: IndexStrategy) -> Self {
        match strategy {
            IndexStrategy::First => self.then(LocatorStep::First),
            IndexStrategy::Last => self.then(LocatorStep::Last),
            IndexStrategy::Nth(n) => self.then(LocatorStep::Nth(n)),
        }
    }

    /// Steps of the chain
    #[must_use]
    pub fn steps(&self) -> &[LocatorStep] {
        &self.steps
    }

    /// Whether the chain is the bare page
    #[must_use]
    pub fn is_page(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("page");
        }
        let parts: Vec<String> = self.steps.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(" >> "))
    }
}

/// A point in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

/// Element bounding box in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoundingBox {
    /// Center point
    #[must_use]
    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }

    /// Whether the box has a visible area
    #[must_use]
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Build the locator for `raw` inside `scope`.
///
/// Index strategy is skipped when `unindexed` is set; `nth` combined with
/// `first`/`last` fails before anything is resolved.
pub fn make_locator(
    scope: &Locator,
    raw: &str,
    ctx: &ContextView<'_>,
    unindexed: bool,
) -> JsonwrightResult<Locator> {
    let base = scope.clone().target(&classify(raw));
    if unindexed {
        return Ok(base);
    }
    Ok(base.indexed(ctx.index_strategy()?))
}

/// Count matches, treating driver errors as zero.
pub async fn count_matches<D: BrowserDriver + ?Sized>(driver: &D, locator: &Locator) -> usize {
    match driver.count(locator).await {
        Ok(n) => n,
        Err(err) => {
            debug!(locator = %locator, error = %err, "count failed, treating as zero");
            0
        }
    }
}

/// Fail with a not-found error when `locator` matches nothing.
pub async fn ensure_found<D: BrowserDriver + ?Sized>(
    driver: &D,
    locator: &Locator,
    stage: Stage,
    raw: &str,
    ctx_note: &str,
) -> JsonwrightResult<()> {
    if count_matches(driver, locator).await == 0 {
        return Err(JsonwrightError::NotFound {
            stage,
            target: raw.to_string(),
            context: ctx_note.to_string(),
        });
    }
    Ok(())
}

/// Indexed, existence-checked locator for an action target.
pub async fn locate<D: BrowserDriver + ?Sized>(
    driver: &D,
    scope: &Locator,
    raw: &str,
    ctx: &ContextView<'_>,
) -> JsonwrightResult<Locator> {
    let locator = make_locator(scope, raw, ctx, false)?;
    ensure_found(driver, &locator, Stage::Target, raw, &ctx.describe()).await?;
    Ok(locator)
}

/// Unindexed, existence-checked locator (all matches).
pub async fn locate_all<D: BrowserDriver + ?Sized>(
    driver: &D,
    scope: &Locator,
    raw: &str,
    ctx: &ContextView<'_>,
    stage: Stage,
) -> JsonwrightResult<Locator> {
    let locator = make_locator(scope, raw, ctx, true)?;
    ensure_found(driver, &locator, stage, raw, &ctx.describe()).await?;
    Ok(locator)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::context::LocatorContext;
    use crate::driver::mock::{MockDom, MockDriver, MockElement};
    use serde_json::json;

    fn driver() -> MockDriver {
        MockDriver::new(
            MockDom::new().child(
                MockElement::new("ul")
                    .id("list")
                    .child(MockElement::new("li").class("item").text("One"))
                    .child(MockElement::new("li").class("item").text("Two"))
                    .child(MockElement::new("button").text("Save changes")),
            ),
        )
    }

    mod chain_tests {
        use super::*;

        #[test]
        fn test_display() {
            let loc = Locator::page().frame("#f").css(".x").parent().nth(2);
            assert_eq!(loc.to_string(), r##"frame="#f" >> css=".x" >> .. >> nth=2"##);
            assert_eq!(Locator::page().to_string(), "page");
        }

        #[test]
        fn test_make_locator_applies_index() {
            let ctx = LocatorContext::default();
            let view = ContextView::new(&ctx, None);
            let loc = make_locator(&Locator::page(), "Sign in", &view, false).unwrap();
            assert_eq!(
                loc.steps(),
                &[LocatorStep::Text("Sign in".into()), LocatorStep::First]
            );
            let loc = make_locator(&Locator::page(), "#a", &view, true).unwrap();
            assert_eq!(loc.steps(), &[LocatorStep::Css("#a".into())]);
        }

        #[test]
        fn test_make_locator_rejects_mixed_index() {
            let ctx: LocatorContext = serde_json::from_value(json!({"nth": 1, "last": true})).unwrap();
            let view = ContextView::new(&ctx, None);
            assert!(make_locator(&Locator::page(), "#a", &view, false).is_err());
            assert!(make_locator(&Locator::page(), "#a", &view, true).is_ok());
        }

        #[test]
        fn test_bounding_box_center() {
            let b = BoundingBox {
                x: 10.0,
                y: 20.0,
                width: 100.0,
                height: 50.0,
            };
            assert_eq!(b.center(), Point { x: 60.0, y: 45.0 });
            assert!(b.has_area());
        }
    }

    mod resolve_tests {
        use super::*;

        #[tokio::test]
        async fn test_locate_by_text_and_tag_text() {
            let d = driver();
            let ctx = LocatorContext::default();
            let view = ContextView::new(&ctx, None);
            let loc = locate(&d, &Locator::page(), "Two", &view).await.unwrap();
            assert_eq!(d.count(&loc).await.unwrap(), 1);
            let loc = locate(&d, &Locator::page(), "button > Save", &view).await.unwrap();
            assert_eq!(d.count(&loc).await.unwrap(), 1);
        }

        #[tokio::test]
        async fn test_not_found_carries_context() {
            let d = driver();
            let ctx: LocatorContext = serde_json::from_value(json!({"within": "#list"})).unwrap();
            let view = ContextView::new(&ctx, None);
            let err = locate(&d, &Locator::page(), "#missing", &view)
                .await
                .unwrap_err();
            let msg = err.to_string();
            assert!(msg.contains("target not found: \"#missing\""));
            assert!(msg.contains("within=\"#list\""));
        }

        #[tokio::test]
        async fn test_locate_all_keeps_every_match() {
            let d = driver();
            let ctx = LocatorContext::default();
            let view = ContextView::new(&ctx, None);
            let loc = locate_all(&d, &Locator::page(), ".item", &view, Stage::Items)
                .await
                .unwrap();
            assert_eq!(count_matches(&d, &loc).await, 2);
        }
    }
}
