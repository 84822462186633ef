//! Scope composition: frames, then root, then parent climb, then within.
//!
//! Each stage narrows the previous one. Root, parent and within must match
//! at least one element; frames are entered without a check.

use crate::classify::is_selector;
use crate::context::ContextView;
use crate::driver::BrowserDriver;
use crate::locator::{ensure_found, Locator};
use crate::result::{JsonwrightResult, Stage};
use tracing::debug;

/// Compose the scope an action's targets are searched in.
///
/// `base` replaces the page root, as happens for each `forEach` item.
pub async fn build_scope(
    driver: &dyn BrowserDriver,
    ctx: &ContextView<'_>,
    base: Option<&Locator>,
) -> JsonwrightResult<Locator> {
    let mut scope = base.cloned().unwrap_or_else(Locator::page);
    let note = ctx.describe();

    for frame in ctx.frames() {
        scope = scope.frame(frame);
    }

    if let Some(root) = ctx.root() {
        let candidate = scope.css(root);
        ensure_found(driver, &candidate, Stage::Root, root, &note).await?;
        scope = candidate;
    }

    if let Some(parent) = ctx.parent() {
        let anchor = if is_selector(parent) {
            scope.css(parent)
        } else {
            scope.text(parent)
        };
        ensure_found(driver, &anchor, Stage::Parent, parent, &note).await?;
        let climb = ctx.climb()?;
        scope = (0..climb).fold(anchor, |loc, _| loc.parent());
    }

    if let Some(within) = ctx.within() {
        let candidate = scope.css(within);
        ensure_found(driver, &candidate, Stage::Within, within, &note).await?;
        scope = candidate;
    }

    debug!(scope = %scope, "scope built");
    Ok(scope)
}
