//! Specification document model.
//!
//! An action is kept as raw JSON until it is executed: `run` and `route` read
//! the template directly, then the interpolated copy is parsed into a typed
//! [`Action`].

use crate::context::LocatorContext;
use crate::network::AbortReason;
use crate::result::{JsonwrightError, JsonwrightResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Operation keys in execution order
pub const OPERATION_KEYS: &[&str] = &[
    "route",
    "run",
    "exist",
    "forEach",
    "getText",
    "typeSlow",
    "type",
    "click",
    "hover",
    "press",
    "check",
    "uncheck",
    "select",
    "upload",
    "expectText",
    "expectVisible",
    "expectValue",
    "expectUrl",
    "waitRequest",
    "waitResponse",
    "wait",
    "scrollTo",
    "screenshot",
];

/// A single value or a list of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// Single value
    One(T),
    /// List of values
    Many(Vec<T>),
}

impl<T: Clone> OneOrMany<T> {
    /// All values in order
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        match self {
            Self::One(v) => vec![v.clone()],
            Self::Many(vs) => vs.clone(),
        }
    }
}

impl<T: Serialize> OneOrMany<T> {
    /// JSON rendering, used in diagnostics
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Accept strings, numbers and booleans where text is expected
fn string_like<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other @ (Value::Number(_) | Value::Bool(_))) => Some(other.to_string()),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected a string, got {other}"
            )))
        }
    })
}

/// One instruction of a case
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Locator hints overriding the case context
    #[serde(flatten)]
    pub context: LocatorContext,
    /// Explicit target for type/press/select/expect*
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<String>,
    /// Fallback timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Extra bag key for the `run` result
    #[serde(default, rename = "as", skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Request interception
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteSpec>,
    /// Function bag method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
    /// Existence gate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exist: Option<String>,
    /// Iteration over matched items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_each: Option<ForEachSpec>,
    /// Capture text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_text: Option<String>,
    /// Fill text (dynamic values allowed)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_text: Option<String>,
    /// Type text one character at a time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_slow: Option<String>,
    /// Click target or `{type}` placeholder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click: Option<String>,
    /// Hover target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hover: Option<String>,
    /// Key chord
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub press: Option<String>,
    /// Check a checkbox/radio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<CheckTarget>,
    /// Uncheck a checkbox
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncheck: Option<CheckTarget>,
    /// Select options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<SelectSpec>,
    /// Attach files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadSpec>,
    /// Text assertion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_text: Option<TextExpectation>,
    /// Visibility assertion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_visible: Option<VisibleExpectation>,
    /// Input value assertion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_value: Option<ValueExpectation>,
    /// Location assertion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_url: Option<TextExpectation>,
    /// Wait for a response by URL substring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_request: Option<WaitRequestSpec>,
    /// Wait for a response by URL glob
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_response: Option<WaitResponseSpec>,
    /// Pause in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<u64>,
    /// Page or element scroll
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_to: Option<ScrollSpec>,
    /// Capture a PNG
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<ScreenshotSpec>,
}

impl Action {
    /// Parse an interpolated action object
    pub fn from_value(value: Value) -> JsonwrightResult<Self> {
        if !value.is_object() {
            return Err(JsonwrightError::config(format!(
                "action must be an object, got {value}"
            )));
        }
        serde_json::from_value(value)
            .map_err(|e| JsonwrightError::config(format!("invalid action: {e}")))
    }

    /// Whether `raw` carries any operation key
    #[must_use]
    pub fn has_operation(raw: &Map<String, Value>) -> bool {
        OPERATION_KEYS.iter().any(|k| raw.contains_key(*k))
    }

    /// `click` when it names a selector
    #[must_use]
    pub fn click_selector(&self) -> Option<&str> {
        self.click
            .as_deref()
            .filter(|c| crate::classify::is_selector(c))
    }

    /// `loc`, else `click` when it names a selector
    #[must_use]
    pub fn explicit_target(&self) -> Option<&str> {
        self.loc.as_deref().or_else(|| self.click_selector())
    }
}

/// `route` forms: unroute, abort or fulfill
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    /// Patterns to remove
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unroute: Option<OneOrMany<String>>,
    /// Patterns to block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort: Option<OneOrMany<String>>,
    /// Failure reported for blocked requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<AbortReason>,
    /// Pattern to fulfill
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Fulfilled status (200)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Fulfilled headers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// JSON body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<Value>,
    /// Raw body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Content type of a raw body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// `forEach` block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForEachSpec {
    /// Selector or text matching the items
    #[serde(default)]
    pub items: Option<String>,
    /// Actions run with each item as scope
    #[serde(default)]
    pub actions: Vec<Value>,
}

/// `check`/`uncheck` target forms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckTarget {
    /// Target string
    Target(String),
    /// `{ "loc": ... }`
    Object {
        /// Target string
        #[serde(default)]
        loc: Option<String>,
    },
    /// `true`: target taken from `loc`/`click`
    Flag(bool),
}

impl CheckTarget {
    /// Target written on the operation itself
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Target(t) => Some(t.as_str()),
            Self::Object { loc } => loc.as_deref(),
            Self::Flag(_) => None,
        }
        .filter(|t| !t.trim().is_empty())
    }
}

/// `select` block: the first of value/label/index wins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectSpec {
    /// Explicit target
    #[serde(default)]
    pub loc: Option<String>,
    /// Option values
    #[serde(default)]
    pub value: Option<OneOrMany<String>>,
    /// Option labels
    #[serde(default)]
    pub label: Option<OneOrMany<String>>,
    /// Option positions
    #[serde(default)]
    pub index: Option<OneOrMany<usize>>,
}

/// `upload` forms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UploadSpec {
    /// `"a.txt"` or `["a.txt", "b.txt"]`
    Files(OneOrMany<String>),
    /// `{ "loc": ..., "files": ... }`
    Object {
        /// Explicit target
        #[serde(default)]
        loc: Option<String>,
        /// Files to attach
        #[serde(default)]
        files: Option<OneOrMany<String>>,
    },
}

impl UploadSpec {
    /// Explicit target, if any
    #[must_use]
    pub fn loc(&self) -> Option<&str> {
        match self {
            Self::Files(_) => None,
            Self::Object { loc, .. } => loc.as_deref(),
        }
    }

    /// Requested files as written
    #[must_use]
    pub fn files(&self) -> Vec<String> {
        match self {
            Self::Files(f) => f.to_vec(),
            Self::Object { files, .. } => files.as_ref().map(OneOrMany::to_vec).unwrap_or_default(),
        }
    }
}

/// `equals`/`contains` assertion used by `expectText` and `expectUrl`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextExpectation {
    /// Exact match
    #[serde(default, deserialize_with = "string_like")]
    pub equals: Option<String>,
    /// Substring match
    #[serde(default, deserialize_with = "string_like")]
    pub contains: Option<String>,
    /// Timeout in milliseconds
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// `expectVisible` forms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VisibleExpectation {
    /// Target string; timeout from the action
    Target(String),
    /// Target from `loc`/`click`
    Options {
        /// Timeout in milliseconds
        #[serde(default)]
        timeout: Option<u64>,
    },
}

/// `expectValue` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueExpectation {
    /// Input target
    #[serde(default)]
    pub loc: Option<String>,
    /// Exact value
    #[serde(default, deserialize_with = "string_like")]
    pub equals: Option<String>,
    /// Value substring
    #[serde(default, deserialize_with = "string_like")]
    pub contains: Option<String>,
    /// Timeout in milliseconds
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// `waitRequest` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitRequestSpec {
    /// URL substrings; any may match
    #[serde(default)]
    pub url_includes: Option<OneOrMany<String>>,
    /// Accepted status codes
    #[serde(default)]
    pub status: Option<OneOrMany<u16>>,
    /// Timeout in milliseconds
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// `waitResponse` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitResponseSpec {
    /// URL glob
    #[serde(default)]
    pub url: Option<String>,
    /// Required status
    #[serde(default)]
    pub status: Option<u16>,
    /// Required body substring
    #[serde(default)]
    pub body_contains: Option<String>,
    /// Timeout in milliseconds
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// `scrollTo` forms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScrollSpec {
    /// `"top"` or `"bottom"`
    Named(String),
    /// `{x, y, behavior}` or `{to}`
    Object {
        /// Horizontal offset
        #[serde(default)]
        x: Option<f64>,
        /// Vertical offset
        #[serde(default)]
        y: Option<f64>,
        /// `auto`, `smooth` or `instant`
        #[serde(default)]
        behavior: Option<String>,
        /// Element to bring into view
        #[serde(default)]
        to: Option<String>,
    },
}

/// `screenshot` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotSpec {
    /// Output file
    #[serde(default)]
    pub path: Option<String>,
    /// Capture beyond the viewport
    #[serde(default)]
    pub full_page: bool,
    /// Element to capture
    #[serde(default)]
    pub loc: Option<String>,
}

/// One scenario
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Case {
    /// Display title
    #[serde(default)]
    pub title: Option<String>,
    /// Navigation target
    #[serde(default)]
    pub url: Option<String>,
    /// Action templates
    #[serde(default)]
    pub actions: Vec<Value>,
    /// Default locator hints
    #[serde(default)]
    pub context: Option<CaseContext>,
}

/// Case-level context: locator hints plus a legacy default target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseContext {
    /// Locator hints
    #[serde(flatten)]
    pub locator: LocatorContext,
    /// Default target for `check`/`uncheck`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<String>,
    /// Default selector target for `check`/`uncheck`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click: Option<String>,
}

impl CaseContext {
    /// `loc`, else `click` when it names a selector
    #[must_use]
    pub fn legacy_target(&self) -> Option<&str> {
        self.loc.as_deref().or_else(|| {
            self.click
                .as_deref()
                .filter(|c| crate::classify::is_selector(c))
        })
    }
}

impl Case {
    /// Parse a case entry
    pub fn from_value(value: Value) -> JsonwrightResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| JsonwrightError::config(format!("invalid case: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    mod action_tests {
        use super::*;

        #[test]
        fn test_operation_keys_and_context() {
            let action = Action::from_value(json!({
                "type": "hello", "loc": "#name", "nth": 2, "within": ".form", "as": "x"
            }))
            .unwrap();
            assert_eq!(action.type_text.as_deref(), Some("hello"));
            assert_eq!(action.context.nth, Some(2));
            assert_eq!(action.context.within.as_deref(), Some(".form"));
            assert_eq!(action.alias.as_deref(), Some("x"));
        }

        #[test]
        fn test_has_operation() {
            let raw = json!({"nth": 1, "within": "#x"});
            assert!(!Action::has_operation(raw.as_object().unwrap()));
            let raw = json!({"wait": 10});
            assert!(Action::has_operation(raw.as_object().unwrap()));
        }

        #[test]
        fn test_explicit_target_prefers_loc() {
            let a = Action::from_value(json!({"loc": "#a", "click": "#b"})).unwrap();
            assert_eq!(a.explicit_target(), Some("#a"));
            let a = Action::from_value(json!({"click": "#b"})).unwrap();
            assert_eq!(a.explicit_target(), Some("#b"));
            let a = Action::from_value(json!({"click": "Save"})).unwrap();
            assert_eq!(a.explicit_target(), None);
        }

        #[test]
        fn test_non_object_rejected() {
            assert!(Action::from_value(json!("click")).unwrap_err().is_config());
            assert!(Action::from_value(json!({"wait": "soon"})).unwrap_err().is_config());
        }
    }

    mod form_tests {
        use super::*;

        #[test]
        fn test_check_forms() {
            let a = Action::from_value(json!({"check": "#agree"})).unwrap();
            assert_eq!(a.check.unwrap().target(), Some("#agree"));
            let a = Action::from_value(json!({"check": {"loc": "#x"}})).unwrap();
            assert_eq!(a.check.unwrap().target(), Some("#x"));
            let a = Action::from_value(json!({"uncheck": true})).unwrap();
            assert_eq!(a.uncheck.unwrap().target(), None);
        }

        #[test]
        fn test_upload_forms() {
            let a = Action::from_value(json!({"upload": "a.txt"})).unwrap();
            assert_eq!(a.upload.unwrap().files(), vec!["a.txt"]);
            let a = Action::from_value(json!({"upload": {"loc": "#f", "files": ["a", "b"]}})).unwrap();
            let up = a.upload.unwrap();
            assert_eq!(up.loc(), Some("#f"));
            assert_eq!(up.files().len(), 2);
        }

        #[test]
        fn test_expectations_accept_numbers() {
            let a = Action::from_value(json!({"expectValue": {"loc": "#n", "equals": 42}})).unwrap();
            assert_eq!(a.expect_value.unwrap().equals.as_deref(), Some("42"));
        }

        #[test]
        fn test_visible_and_scroll_forms() {
            let a = Action::from_value(json!({"expectVisible": {"timeout": 10}, "loc": "#x"})).unwrap();
            assert_eq!(
                a.expect_visible,
                Some(VisibleExpectation::Options { timeout: Some(10) })
            );
            let a = Action::from_value(json!({"scrollTo": {"to": "#footer"}})).unwrap();
            assert!(matches!(a.scroll_to, Some(ScrollSpec::Object { to: Some(_), .. })));
        }

        #[test]
        fn test_one_or_many_json() {
            let many: OneOrMany<String> = serde_json::from_value(json!(["a", "b"])).unwrap();
            assert_eq!(many.to_json(), json!(["a", "b"]));
            let one: OneOrMany<u16> = serde_json::from_value(json!(201)).unwrap();
            assert_eq!(one.to_vec(), vec![201]);
        }
    }

    mod case_tests {
        use super::*;

        #[test]
        fn test_case_defaults() {
            let case = Case::from_value(json!({"actions": [{"click": "#a"}]})).unwrap();
            assert!(case.title.is_none());
            assert_eq!(case.actions.len(), 1);
            assert!(case.context.is_none());
        }

        #[test]
        fn test_case_context_legacy_target() {
            let case = Case::from_value(json!({
                "context": {"within": "#form", "click": "#agree"}
            }))
            .unwrap();
            let ctx = case.context.unwrap();
            assert_eq!(ctx.locator.within.as_deref(), Some("#form"));
            assert_eq!(ctx.legacy_target(), Some("#agree"));
        }
    }
}
