//! Variable bag and `{token}` interpolation.
//!
//! Tokens follow `{name(.segment)*}` where a segment may start with `$` or
//! `-`. The first segment must be a key of the bag, otherwise the token is
//! kept verbatim. Deeper segments walk nested objects (and arrays by
//! index); anything missing renders as the empty string.

use serde_json::{Map, Value};

/// Per-case mapping from variable name to captured or computed value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableBag {
    values: Map<String, Value>,
}

impl VariableBag {
    /// Create an empty bag
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any previous one
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Look up a top-level value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Whether the key is present
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the bag is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Resolve a dotted path. `None` when the first segment is unknown.
    #[must_use]
    pub fn lookup(&self, path: &[&str]) -> Option<Option<&Value>> {
        let (head, rest) = path.split_first()?;
        let root = self.values.get(*head)?;
        let mut current = Some(root);
        for segment in rest {
            current = current.and_then(|v| child(v, segment));
        }
        Some(current)
    }
}

impl From<Map<String, Value>> for VariableBag {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Render a resolved value as interpolation text.
#[must_use]
pub fn stringify(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Expand every `{token}` in `input` against `bag`.
#[must_use]
pub fn interpolate_str(input: &str, bag: &VariableBag) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match parse_token(after) {
            Some(len) => {
                let token = &after[..len];
                let path: Vec<&str> = token.split('.').collect();
                match bag.lookup(&path) {
                    Some(value) => out.push_str(&stringify(value)),
                    None => {
                        out.push('{');
                        out.push_str(token);
                        out.push('}');
                    }
                }
                rest = &after[len + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Recursively interpolate every string leaf of a JSON value.
#[must_use]
pub fn interpolate_value(value: &Value, bag: &VariableBag) -> Value {
    match value {
        Value::String(s) => Value::String(interpolate_str(s, bag)),
        Value::Array(items) => Value::Array(items.iter().map(|v| interpolate_value(v, bag)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), interpolate_value(v, bag)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Length of a well-formed token body (up to, not including, `}`).
fn parse_token(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = word_end(bytes, 0)?;
    loop {
        match bytes.get(i) {
            Some(b'}') => return Some(i),
            Some(b'.') => {
                let mut j = i + 1;
                if matches!(bytes.get(j), Some(b'$' | b'-')) {
                    j += 1;
                }
                i = word_end(bytes, j)?;
            }
            _ => return None,
        }
    }
}

fn word_end(bytes: &[u8], start: usize) -> Option<usize> {
    let len = bytes[start.min(bytes.len())..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count();
    (len > 0).then_some(start + len)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bag() -> VariableBag {
        let mut bag = VariableBag::new();
        bag.set("user", json!({"email": "a@b.com", "age": 30, "tags": ["x", "y"], "$id": 7}));
        bag.set("resultFunc", "hello");
        bag.set("empty", Value::Null);
        bag
    }

    mod interpolate_str_tests {
        use super::*;

        #[test]
        fn test_nested_lookup() {
            assert_eq!(interpolate_str("hi {user.email}", &bag()), "hi a@b.com");
        }

        #[test]
        fn test_unknown_token_kept_verbatim() {
            assert_eq!(interpolate_str("{missing}", &bag()), "{missing}");
            assert_eq!(interpolate_str("#list {type}", &bag()), "#list {type}");
        }

        #[test]
        fn test_missing_leaf_is_empty() {
            assert_eq!(interpolate_str("[{user.phone}]", &bag()), "[]");
            assert_eq!(interpolate_str("[{user.email.x}]", &bag()), "[]");
            assert_eq!(interpolate_str("[{empty}]", &bag()), "[]");
        }

        #[test]
        fn test_non_strings_are_stringified() {
            assert_eq!(interpolate_str("{user.age}", &bag()), "30");
            assert_eq!(interpolate_str("{user.tags}", &bag()), r#"["x","y"]"#);
            assert_eq!(interpolate_str("{user.tags.1}", &bag()), "y");
        }

        #[test]
        fn test_dollar_segment() {
            assert_eq!(interpolate_str("{user.$id}", &bag()), "7");
        }

        #[test]
        fn test_malformed_braces_pass_through() {
            assert_eq!(interpolate_str("{ resultFunc }", &bag()), "{ resultFunc }");
            assert_eq!(interpolate_str("{{resultFunc}}", &bag()), "{hello}");
            assert_eq!(interpolate_str("trailing {", &bag()), "trailing {");
            assert_eq!(interpolate_str("{resultFunc.}", &bag()), "{resultFunc.}");
        }

        #[test]
        fn test_multiple_tokens() {
            assert_eq!(
                interpolate_str("{resultFunc}, {user.email}!", &bag()),
                "hello, a@b.com!"
            );
        }
    }

    mod interpolate_value_tests {
        use super::*;

        #[test]
        fn test_only_string_leaves_change() {
            let action = json!({
                "expectText": {"loc": "#who", "equals": "{user.email}"},
                "upload": ["{resultFunc}.txt"],
                "timeout": 500,
                "first": true
            });
            let out = interpolate_value(&action, &bag());
            assert_eq!(out["expectText"]["equals"], "a@b.com");
            assert_eq!(out["upload"][0], "hello.txt");
            assert_eq!(out["timeout"], 500);
            assert_eq!(out["first"], true);
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_text_without_braces_is_unchanged(s in "[^{}]{0,40}") {
                prop_assert_eq!(interpolate_str(&s, &bag()), s);
            }

            #[test]
            fn prop_unknown_tokens_survive(name in "zz[a-z]{1,8}") {
                let raw = format!("{{{name}}}");
                prop_assert_eq!(interpolate_str(&raw, &bag()), raw);
            }
        }
    }
}
