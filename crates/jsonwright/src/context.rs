//! Locator context: nth/first/last/within/frame/root/parent hints.
//!
//! Hints can be attached to a case (`"context": {...}`) and overridden per
//! action. [`ContextView`] merges the two with action values winning key by
//! key.

use crate::result::{JsonwrightError, JsonwrightResult};
use crate::schema::OneOrMany;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Deepest ancestor climb accepted for `parent`
pub const MAX_CLIMB: usize = 256;

/// Resolution hints attached to a case or an action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocatorContext {
    /// Zero-based occurrence; negative counts from the end
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nth: Option<i64>,
    /// Select the first match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<bool>,
    /// Select the last match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<bool>,
    /// Selector narrowing the scope last
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub within: Option<String>,
    /// Frame selector chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<OneOrMany<String>>,
    /// Alias of `frame`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iframe: Option<OneOrMany<String>>,
    /// Selector narrowing the scope to a subtree
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    /// Selector or text whose ancestor becomes the scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// How many ancestors to climb from `parent`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<f64>,
}

/// How a multi-match locator is narrowed to one element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStrategy {
    /// First match (default)
    First,
    /// Last match
    Last,
    /// Zero-based occurrence
    Nth(i64),
}

/// Action context layered over the case context
#[derive(Debug, Clone, Copy)]
pub struct ContextView<'a> {
    action: &'a LocatorContext,
    case: Option<&'a LocatorContext>,
}

impl<'a> ContextView<'a> {
    /// Merge an action context with its (optional) case context
    #[must_use]
    pub const fn new(action: &'a LocatorContext, case: Option<&'a LocatorContext>) -> Self {
        Self { action, case }
    }

    fn pick<T>(&self, get: impl Fn(&'a LocatorContext) -> Option<T>) -> Option<T> {
        get(self.action).or_else(|| self.case.and_then(&get))
    }

    /// Effective `nth`
    #[must_use]
    pub fn nth(&self) -> Option<i64> {
        self.pick(|c| c.nth)
    }

    /// Effective `first`
    #[must_use]
    pub fn first(&self) -> bool {
        self.pick(|c| c.first).unwrap_or(false)
    }

    /// Effective `last`
    #[must_use]
    pub fn last(&self) -> bool {
        self.pick(|c| c.last).unwrap_or(false)
    }

    /// Effective `within`
    #[must_use]
    pub fn within(&self) -> Option<&'a str> {
        self.pick(|c| c.within.as_deref())
    }

    /// Effective `root`
    #[must_use]
    pub fn root(&self) -> Option<&'a str> {
        self.pick(|c| c.root.as_deref())
    }

    /// Effective `parent`
    #[must_use]
    pub fn parent(&self) -> Option<&'a str> {
        self.pick(|c| c.parent.as_deref())
    }

    /// Ancestor climb count for `parent`; at least one, at most [`MAX_CLIMB`].
    pub fn climb(&self) -> JsonwrightResult<usize> {
        match self.pick(|c| c.index) {
            Some(n) if n > MAX_CLIMB as f64 => Err(JsonwrightError::config(format!(
                "parent index {n} exceeds the limit of {MAX_CLIMB}"
            ))),
            Some(n) if n >= 1.0 => Ok(n.floor() as usize),
            _ => Ok(1),
        }
    }

    /// Frame chain: `frame` wins over `iframe`, action over case.
    #[must_use]
    pub fn frames(&self) -> Vec<String> {
        let own = |c: &'a LocatorContext| c.frame.as_ref().or(c.iframe.as_ref());
        self.pick(own).map(OneOrMany::to_vec).unwrap_or_default()
    }

    /// Index strategy, rejecting `nth` mixed with `first`/`last`.
    pub fn index_strategy(&self) -> JsonwrightResult<IndexStrategy> {
        let (first, last) = (self.first(), self.last());
        match self.nth() {
            Some(_) if first || last => Err(JsonwrightError::InvalidIndex),
            Some(n) => Ok(IndexStrategy::Nth(n)),
            None if last => Ok(IndexStrategy::Last),
            None => Ok(IndexStrategy::First),
        }
    }

    /// Diagnostics suffix such as ` [ctx frame="#f" nth=1]`, or empty.
    #[must_use]
    pub fn describe(&self) -> String {
        let entries: [(&str, Option<Value>); 9] = [
            ("frame", self.pick(|c| c.frame.as_ref()).map(OneOrMany::to_json)),
            ("iframe", self.pick(|c| c.iframe.as_ref()).map(OneOrMany::to_json)),
            ("root", self.root().map(Value::from)),
            ("within", self.within().map(Value::from)),
            ("parent", self.parent().map(Value::from)),
            ("index", self.pick(|c| c.index).map(Value::from)),
            ("nth", self.nth().map(Value::from)),
            ("first", self.pick(|c| c.first).map(Value::from)),
            ("last", self.pick(|c| c.last).map(Value::from)),
        ];
        let parts: Vec<String> = entries
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| format!("{k}={v}")))
            .collect();
        if parts.is_empty() {
            String::new()
        } else {
            format!(" [ctx {}]", parts.join(" "))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(v: Value) -> LocatorContext {
        serde_json::from_value(v).unwrap()
    }

    mod precedence_tests {
        use super::*;

        #[test]
        fn test_action_wins_per_key() {
            let action = ctx(json!({"within": "#a"}));
            let case = ctx(json!({"within": "#b", "root": "#r"}));
            let view = ContextView::new(&action, Some(&case));
            assert_eq!(view.within(), Some("#a"));
            assert_eq!(view.root(), Some("#r"));
        }

        #[test]
        fn test_frame_chain_forms() {
            let action = ctx(json!({"iframe": ["#outer", "#inner"]}));
            let view = ContextView::new(&action, None);
            assert_eq!(view.frames(), vec!["#outer", "#inner"]);

            let case = ctx(json!({"frame": "#f"}));
            let empty = LocatorContext::default();
            let view = ContextView::new(&empty, Some(&case));
            assert_eq!(view.frames(), vec!["#f"]);
        }

        #[test]
        fn test_climb_defaults_to_one() {
            let none = LocatorContext::default();
            assert_eq!(ContextView::new(&none, None).climb().unwrap(), 1);
            let zero = ctx(json!({"index": 0}));
            assert_eq!(ContextView::new(&zero, None).climb().unwrap(), 1);
            let two = ctx(json!({"index": 2.7}));
            assert_eq!(ContextView::new(&two, None).climb().unwrap(), 2);
        }

        #[test]
        fn test_climb_is_capped() {
            let max = ctx(json!({"index": MAX_CLIMB}));
            assert_eq!(ContextView::new(&max, None).climb().unwrap(), MAX_CLIMB);
            let huge = ctx(json!({"index": 1e12}));
            let err = ContextView::new(&huge, None).climb().unwrap_err();
            assert!(err.is_config());
            assert!(err.to_string().contains("exceeds the limit"));
        }
    }

    mod index_tests {
        use super::*;

        #[test]
        fn test_default_is_first() {
            let c = LocatorContext::default();
            assert_eq!(
                ContextView::new(&c, None).index_strategy().unwrap(),
                IndexStrategy::First
            );
        }

        #[test]
        fn test_nth_and_last() {
            let c = ctx(json!({"nth": 2}));
            assert_eq!(
                ContextView::new(&c, None).index_strategy().unwrap(),
                IndexStrategy::Nth(2)
            );
            let c = ctx(json!({"last": true}));
            assert_eq!(
                ContextView::new(&c, None).index_strategy().unwrap(),
                IndexStrategy::Last
            );
        }

        #[test]
        fn test_nth_with_first_is_rejected() {
            let c = ctx(json!({"nth": 1, "first": true}));
            let err = ContextView::new(&c, None).index_strategy().unwrap_err();
            assert!(matches!(err, JsonwrightError::InvalidIndex));
        }

        #[test]
        fn test_conflict_across_layers() {
            let action = ctx(json!({"nth": 0}));
            let case = ctx(json!({"last": true}));
            assert!(ContextView::new(&action, Some(&case))
                .index_strategy()
                .is_err());
        }

        #[test]
        fn test_false_flags_do_not_conflict() {
            let c = ctx(json!({"nth": 1, "first": false}));
            assert_eq!(
                ContextView::new(&c, None).index_strategy().unwrap(),
                IndexStrategy::Nth(1)
            );
        }
    }

    mod describe_tests {
        use super::*;

        #[test]
        fn test_empty_context_renders_nothing() {
            let c = LocatorContext::default();
            assert_eq!(ContextView::new(&c, None).describe(), "");
        }

        #[test]
        fn test_rendered_in_fixed_order() {
            let c = ctx(json!({"nth": 1, "frame": "#f", "within": ".w"}));
            assert_eq!(
                ContextView::new(&c, None).describe(),
                r##" [ctx frame="#f" within=".w" nth=1]"##
            );
        }
    }
}
