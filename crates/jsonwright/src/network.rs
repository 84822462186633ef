//! Network matching and interception rules.
//!
//! Used by `waitRequest` / `waitResponse` (matching observed responses) and
//! by `route` (fulfilling or aborting requests before they leave the page).

use crate::result::{JsonwrightError, JsonwrightResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Reasons for aborting a network request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AbortReason {
    /// Request failed
    #[default]
    Failed,
    /// Request was aborted
    Aborted,
    /// Request timed out
    TimedOut,
    /// Access was denied
    AccessDenied,
    /// Connection was refused
    ConnectionRefused,
    /// DNS name could not be resolved
    NameNotResolved,
    /// Request was blocked by client
    BlockedByClient,
}

impl AbortReason {
    /// Chromium error string for this abort reason
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Failed => "net::ERR_FAILED",
            Self::Aborted => "net::ERR_ABORTED",
            Self::TimedOut => "net::ERR_TIMED_OUT",
            Self::AccessDenied => "net::ERR_ACCESS_DENIED",
            Self::ConnectionRefused => "net::ERR_CONNECTION_REFUSED",
            Self::NameNotResolved => "net::ERR_NAME_NOT_RESOLVED",
            Self::BlockedByClient => "net::ERR_BLOCKED_BY_CLIENT",
        }
    }
}

/// A mocked HTTP response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: BTreeMap<String, String>,
    /// Response body
    pub body: Vec<u8>,
    /// Content type
    pub content_type: String,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status: 200,
            headers: BTreeMap::new(),
            body: Vec::new(),
            content_type: "text/plain".to_string(),
        }
    }
}

impl MockResponse {
    /// Create a new mock response
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a JSON response
    pub fn json(data: &serde_json::Value) -> JsonwrightResult<Self> {
        Ok(Self {
            body: serde_json::to_vec(data)?,
            content_type: "application/json".to_string(),
            ..Self::default()
        })
    }

    /// Create a text response
    #[must_use]
    pub fn text(content: &str) -> Self {
        Self {
            body: content.as_bytes().to_vec(),
            ..Self::default()
        }
    }

    /// Set status code
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    /// Set content type
    #[must_use]
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    /// Get body as string
    #[must_use]
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Headers including `content-type` unless set explicitly
    #[must_use]
    pub fn effective_headers(&self) -> BTreeMap<String, String> {
        let mut headers = self.headers.clone();
        if !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
            headers.insert("content-type".to_string(), self.content_type.clone());
        }
        headers
    }
}

/// Pattern for matching request URLs
#[derive(Debug, Clone)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Contains substring
    Contains(String),
    /// Compiled glob (`**` any characters, `*` anything but `/`)
    Glob {
        /// Source pattern
        source: String,
        /// Anchored regex
        regex: Regex,
    },
    /// Match any URL
    Any,
}

impl UrlPattern {
    /// Compile a glob pattern
    pub fn glob(pattern: &str) -> JsonwrightResult<Self> {
        let regex = Regex::new(&glob_to_regex(pattern))
            .map_err(|e| JsonwrightError::config(format!("invalid URL glob '{pattern}': {e}")))?;
        Ok(Self::Glob {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Contains(pattern) => url.contains(pattern.as_str()),
            Self::Glob { regex, .. } => regex.is_match(url),
            Self::Any => true,
        }
    }
}

impl PartialEq for UrlPattern {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(s) => write!(f, "exact:{s}"),
            Self::Contains(s) => write!(f, "contains:{s}"),
            Self::Glob { source, .. } => write!(f, "glob:{source}"),
            Self::Any => f.write_str("*"),
        }
    }
}

/// Translate a URL glob into an anchored regex.
#[must_use]
pub fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str(".*");
            }
            '*' => out.push_str("[^/]*"),
            '.' | '+' | '^' | '$' | '{' | '}' | '(' | ')' | '|' | '[' | ']' | '\\' | '?' => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out.push('$');
    out
}

/// What an intercepted request turns into
#[derive(Debug, Clone, PartialEq)]
pub enum RouteAction {
    /// Answer with a canned response
    Fulfill(MockResponse),
    /// Fail the request
    Abort(AbortReason),
}

/// Interception rule registered through `route`
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRule {
    /// Raw pattern as written (used by `unroute`)
    pub source: String,
    /// Compiled pattern
    pub pattern: UrlPattern,
    /// Outcome for matching requests
    pub action: RouteAction,
}

impl RouteRule {
    /// Build a rule from a glob pattern
    pub fn new(source: &str, action: RouteAction) -> JsonwrightResult<Self> {
        Ok(Self {
            source: source.to_string(),
            pattern: UrlPattern::glob(source)?,
            action,
        })
    }

    /// Whether this rule applies to `url`
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        self.pattern.matches(url)
    }
}

/// Ordered set of route rules; later rules take precedence
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    /// Register a rule
    pub fn add(&mut self, rule: RouteRule) {
        self.rules.push(rule);
    }

    /// Remove every rule registered with `source`; returns how many
    pub fn remove(&mut self, source: &str) -> usize {
        let before = self.rules.len();
        self.rules.retain(|r| r.source != source);
        before - self.rules.len()
    }

    /// Most recent rule matching `url`
    #[must_use]
    pub fn find(&self, url: &str) -> Option<&RouteRule> {
        self.rules.iter().rev().find(|r| r.matches(url))
    }

    /// Number of rules
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// A response observed on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkResponse {
    /// Final URL
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Body text, when it was read
    pub body: Option<String>,
}

impl NetworkResponse {
    /// Create a response without body
    #[must_use]
    pub fn new(url: impl Into<String>, status: u16) -> Self {
        Self {
            url: url.into(),
            status,
            body: None,
        }
    }

    /// Attach a body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Predicate over observed responses
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseMatcher {
    /// Any of these URL patterns must match
    pub urls: Vec<UrlPattern>,
    /// Accepted status codes; empty accepts any
    pub statuses: Vec<u16>,
    /// Required body substring
    pub body_contains: Option<String>,
}

impl ResponseMatcher {
    /// Matcher for any of the given URL substrings
    #[must_use]
    pub fn url_includes(parts: &[String]) -> Self {
        Self {
            urls: parts.iter().cloned().map(UrlPattern::Contains).collect(),
            statuses: Vec::new(),
            body_contains: None,
        }
    }

    /// Matcher for a URL glob
    pub fn glob(pattern: &str) -> JsonwrightResult<Self> {
        Ok(Self {
            urls: vec![UrlPattern::glob(pattern)?],
            statuses: Vec::new(),
            body_contains: None,
        })
    }

    /// Restrict accepted status codes
    #[must_use]
    pub fn with_statuses(mut self, statuses: Vec<u16>) -> Self {
        self.statuses = statuses;
        self
    }

    /// Require a body substring
    #[must_use]
    pub fn with_body_contains(mut self, needle: Option<String>) -> Self {
        self.body_contains = needle;
        self
    }

    /// URL and status check, before any body is read
    #[must_use]
    pub fn matches_head(&self, url: &str, status: u16) -> bool {
        self.urls.iter().any(|p| p.matches(url))
            && (self.statuses.is_empty() || self.statuses.contains(&status))
    }

    /// Whether a body must be fetched to decide
    #[must_use]
    pub const fn needs_body(&self) -> bool {
        self.body_contains.is_some()
    }

    /// Full check including body
    #[must_use]
    pub fn matches(&self, response: &NetworkResponse) -> bool {
        self.matches_head(&response.url, response.status)
            && self.body_contains.as_ref().map_or(true, |needle| {
                response
                    .body
                    .as_deref()
                    .is_some_and(|b| b.contains(needle.as_str()))
            })
    }
}

impl fmt::Display for ResponseMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let urls: Vec<String> = self.urls.iter().map(ToString::to_string).collect();
        write!(f, "response [{}]", urls.join(", "))?;
        if !self.statuses.is_empty() {
            write!(f, " status in {:?}", self.statuses)?;
        }
        if let Some(needle) = &self.body_contains {
            write!(f, " body containing {needle:?}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod glob_tests {
        use super::*;

        #[test]
        fn test_double_star_crosses_segments() {
            let p = UrlPattern::glob("**/api/users/*").unwrap();
            assert!(p.matches("https://x.test/v1/api/users/42"));
            assert!(!p.matches("https://x.test/v1/api/users/42/posts"));
        }

        #[test]
        fn test_special_characters_are_literal() {
            let p = UrlPattern::glob("https://x.test/search?q=*").unwrap();
            assert!(p.matches("https://x.test/search?q=rust"));
            assert!(!p.matches("https://x.test/searchXq=rust"));
            assert_eq!(glob_to_regex("a.b"), r"^a\.b$");
        }

        #[test]
        fn test_anchored() {
            let p = UrlPattern::glob("*/login").unwrap();
            assert!(!p.matches("https://x.test/login"));
            assert!(p.matches("site/login"));
        }
    }

    mod matcher_tests {
        use super::*;

        #[test]
        fn test_url_includes_any() {
            let m = ResponseMatcher::url_includes(&["/a".into(), "/b".into()]);
            assert!(m.matches_head("https://x/b?1", 500));
            assert!(!m.matches_head("https://x/c", 200));
        }

        #[test]
        fn test_status_filter() {
            let m = ResponseMatcher::url_includes(&["/a".into()]).with_statuses(vec![200, 201]);
            assert!(m.matches_head("/a", 201));
            assert!(!m.matches_head("/a", 404));
        }

        #[test]
        fn test_body_contains() {
            let m = ResponseMatcher::glob("**/api/*")
                .unwrap()
                .with_body_contains(Some("\"ok\":true".into()));
            assert!(m.needs_body());
            let hit = NetworkResponse::new("https://x/api/save", 200).with_body(r#"{"ok":true}"#);
            let miss = NetworkResponse::new("https://x/api/save", 200).with_body("{}");
            assert!(m.matches(&hit));
            assert!(!m.matches(&miss));
            assert!(!m.matches(&NetworkResponse::new("https://x/api/save", 200)));
        }
    }

    mod route_tests {
        use super::*;

        #[test]
        fn test_later_rules_win_and_unroute() {
            let mut table = RouteTable::default();
            table.add(RouteRule::new("**/api/**", RouteAction::Abort(AbortReason::Failed)).unwrap());
            table.add(
                RouteRule::new(
                    "**/api/user",
                    RouteAction::Fulfill(MockResponse::text("hi").with_status(201)),
                )
                .unwrap(),
            );
            let rule = table.find("https://x/api/user").unwrap();
            assert!(matches!(rule.action, RouteAction::Fulfill(ref r) if r.status == 201));
            assert_eq!(table.remove("**/api/user"), 1);
            let rule = table.find("https://x/api/user").unwrap();
            assert_eq!(rule.action, RouteAction::Abort(AbortReason::Failed));
            assert_eq!(table.len(), 1);
        }

        #[test]
        fn test_mock_response_headers() {
            let r = MockResponse::json(&serde_json::json!({"a": 1})).unwrap();
            assert_eq!(r.body_string(), r#"{"a":1}"#);
            assert_eq!(
                r.effective_headers().get("content-type").map(String::as_str),
                Some("application/json")
            );
            let r = r.with_header("Content-Type", "text/x");
            assert_eq!(r.effective_headers().len(), 1);
            assert_eq!(AbortReason::BlockedByClient.message(), "net::ERR_BLOCKED_BY_CLIENT");
        }
    }
}
