//! Target classification.
//!
//! Action targets are plain strings that may name a structural selector
//! (`#email`, `form .submit`, `input[name=q]`), free visible text
//! (`Sign in`), or a `tag > text` pattern (`button > Save`). This module
//! turns a raw string into a [`TargetKind`] once, so call sites never
//! inspect the string themselves.

/// Prefix that forces selector interpretation (`css:Sign in`).
pub const SELECTOR_PREFIX: &str = "css:";

/// Standard markup and common SVG element names.
pub const KNOWN_TAGS: &[&str] = &[
    "a", "abbr", "address", "article", "aside", "audio", "b", "base", "bdi", "bdo",
    "blockquote", "body", "br", "button", "canvas", "caption", "cite", "code", "col",
    "colgroup", "data", "datalist", "dd", "del", "details", "dfn", "dialog", "div", "dl",
    "dt", "em", "embed", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2",
    "h3", "h4", "h5", "h6", "head", "header", "hr", "html", "i", "iframe", "img", "input",
    "ins", "kbd", "label", "legend", "li", "link", "main", "map", "mark", "meta", "meter",
    "nav", "noscript", "object", "ol", "optgroup", "option", "output", "p", "picture",
    "pre", "progress", "q", "rp", "rt", "ruby", "s", "samp", "script", "section",
    "select", "slot", "small", "source", "span", "strong", "style", "sub", "summary",
    "sup", "table", "tbody", "td", "template", "textarea", "tfoot", "th", "thead",
    "time", "title", "tr", "track", "u", "ul", "var", "video", "wbr", "svg", "path", "g",
    "circle", "rect", "polygon", "line", "polyline", "text",
];

/// Classified action target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetKind {
    /// Structural selector matched within the scope
    Selector(String),
    /// Elements of `tag` whose visible text contains `text`
    TagText {
        /// Lowercased tag name
        tag: String,
        /// Text to look for
        text: String,
    },
    /// Element whose visible text equals the string exactly
    Text(String),
}

impl TargetKind {
    /// Whether this target is a structural selector
    #[must_use]
    pub const fn is_selector(&self) -> bool {
        matches!(self, Self::Selector(_))
    }
}

/// Classify a raw target string.
#[must_use]
pub fn classify(raw: &str) -> TargetKind {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix(SELECTOR_PREFIX) {
        return TargetKind::Selector(rest.trim().to_string());
    }
    if let Some((tag, text)) = split_tag_text(trimmed) {
        return TargetKind::TagText { tag, text };
    }
    if is_selector(trimmed) {
        TargetKind::Selector(trimmed.to_string())
    } else {
        TargetKind::Text(trimmed.to_string())
    }
}

/// Heuristic selector-vs-text decision.
///
/// Rules are checked in order; the first match wins:
/// 1. explicit `css:` prefix
/// 2. exact known tag name
/// 3. leading `#`, `.`, `[`, `]`, `>`, `+` or `~`
/// 4. any combinator character `>`, `+`, `~`
/// 5. pseudo-class suffix such as `a:hover`
/// 6. tag name directly followed by `#id`, `.class` or `[attr]`
#[must_use]
pub fn is_selector(raw: &str) -> bool {
    let t = raw.trim();
    if t.is_empty() {
        return false;
    }
    if t.starts_with(SELECTOR_PREFIX) || KNOWN_TAGS.contains(&t) {
        return true;
    }
    if t.starts_with(['#', '.', '[', ']', '>', '+', '~']) {
        return true;
    }
    if t.contains(['>', '+', '~']) {
        return true;
    }
    has_pseudo_class(t) || has_qualified_tag(t)
}

/// `tag > text` split. Only applies when the left side is a bare tag name
/// and the right side is not itself selector-like (`ul > li` stays CSS).
fn split_tag_text(raw: &str) -> Option<(String, String)> {
    let (left, right) = raw.split_once('>')?;
    let tag = left.trim();
    let text = right.trim();
    if tag.is_empty() || text.is_empty() || !is_tag_name(tag) {
        return None;
    }
    if is_selector(text) {
        return None;
    }
    Some((tag.to_ascii_lowercase(), text.to_string()))
}

fn is_tag_name(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn has_pseudo_class(t: &str) -> bool {
    let bytes = t.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        if b != b':' {
            return false;
        }
        let preceded = i == 0 || {
            let p = bytes[i - 1];
            p.is_ascii_alphanumeric() || p == b')' || p == b']'
        };
        let followed = bytes
            .get(i + 1)
            .is_some_and(|&n| n.is_ascii_alphabetic() || n == b'-');
        preceded && followed
    })
}

fn has_qualified_tag(t: &str) -> bool {
    let bytes = t.as_bytes();
    if !bytes.first().is_some_and(u8::is_ascii_alphabetic) {
        return false;
    }
    let name_end = bytes
        .iter()
        .position(|&b| !(b.is_ascii_alphanumeric() || b == b'-'))
        .unwrap_or(bytes.len());
    let rest = &bytes[name_end..];
    match rest.first() {
        Some(b'#' | b'.') => rest
            .get(1)
            .is_some_and(|&b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-'),
        Some(b'[') => rest.iter().skip(2).any(|&b| b == b']'),
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod is_selector_tests {
        use super::*;

        #[test]
        fn test_structural_selectors() {
            for raw in [
                "#id",
                ".cls",
                "div",
                "a:hover",
                "input[name=x]",
                "[data-test=save]",
                "form > button",
                "li + li",
                "h1 ~ p",
                "button.primary",
                "section#main",
                "css:Sign in",
                "li:nth-child(2)",
            ] {
                assert!(is_selector(raw), "{raw} should be a selector");
            }
        }

        #[test]
        fn test_free_text() {
            for raw in [
                "Sign in",
                "Click by exact text",
                "Note: read this",
                "Time:12",
                "Button",
                "Version 1 2",
                "",
            ] {
                assert!(!is_selector(raw), "{raw} should be text");
            }
        }

        #[test]
        fn test_tag_must_match_exactly() {
            assert!(is_selector("svg"));
            assert!(is_selector("  td  "));
            assert!(!is_selector("Table"));
        }

        #[test]
        fn test_bracket_needs_content() {
            assert!(!is_selector("a[]"));
            assert!(is_selector("a[x]"));
        }
    }

    mod classify_tests {
        use super::*;

        #[test]
        fn test_tag_text_pattern() {
            assert_eq!(
                classify("Button > Save changes"),
                TargetKind::TagText {
                    tag: "button".into(),
                    text: "Save changes".into()
                }
            );
        }

        #[test]
        fn test_child_combinator_stays_selector() {
            assert_eq!(classify("ul > li"), TargetKind::Selector("ul > li".into()));
            assert_eq!(
                classify("div > .item"),
                TargetKind::Selector("div > .item".into())
            );
        }

        #[test]
        fn test_prefix_is_stripped() {
            assert_eq!(
                classify("css: Sign in"),
                TargetKind::Selector("Sign in".into())
            );
        }

        #[test]
        fn test_text_is_trimmed() {
            assert_eq!(classify("  Sign in "), TargetKind::Text("Sign in".into()));
            assert!(!classify("Sign in").is_selector());
        }

        #[test]
        fn test_empty_side_is_not_tag_text() {
            assert!(classify("> Save").is_selector());
            assert!(classify("button >").is_selector());
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_plain_words_are_text(words in proptest::collection::vec("[A-Z][a-z]{1,8}", 2..5)) {
                let raw = words.join(" ");
                prop_assert!(!is_selector(&raw));
                prop_assert_eq!(classify(&raw), TargetKind::Text(raw.clone()));
            }

            #[test]
            fn prop_id_selectors(id in "[a-z][a-z0-9_-]{0,12}") {
                let raw = format!("#{id}");
                prop_assert!(is_selector(&raw));
            }
        }
    }
}
