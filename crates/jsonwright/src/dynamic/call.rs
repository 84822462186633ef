//! Call-expression parsing for fake-data directives.
//!
//! `faker.internet.email()` or `faker.number.int({ min: 1, max: 9 })` is
//! parsed into a dotted path plus a list of JSON arguments. Nothing is ever
//! evaluated; the path is looked up in a fixed table afterwards.

use crate::result::{JsonwrightError, JsonwrightResult};
use serde_json::{Number, Value};

/// Root namespace of fake-data calls
pub const PROVIDER_ROOT: &str = "faker";

/// Parsed `faker.<path>(<args>)` expression
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    /// Dotted path below the provider root
    pub path: Vec<String>,
    /// Coerced arguments
    pub args: Vec<Value>,
}

impl CallExpr {
    /// Path joined with dots, without the root
    #[must_use]
    pub fn key(&self) -> String {
        self.path.join(".")
    }

    /// Full call path including the root
    #[must_use]
    pub fn display_path(&self) -> String {
        format!("{PROVIDER_ROOT}.{}", self.key())
    }
}

/// Parse a fake-data call. `Ok(None)` when the input is not a call at all.
pub fn parse_call(input: &str) -> JsonwrightResult<Option<CallExpr>> {
    let trimmed = input.trim();
    let Some(rest) = trimmed
        .strip_prefix(PROVIDER_ROOT)
        .and_then(|r| r.strip_prefix('.'))
    else {
        return Ok(None);
    };
    let path_len = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'.')
        .count();
    if path_len == 0 || !rest[path_len..].starts_with('(') || !rest.ends_with(')') {
        return Ok(None);
    }
    let body = &rest[path_len + 1..rest.len() - 1];
    let path = rest[..path_len]
        .split('.')
        .map(str::to_string)
        .collect::<Vec<_>>();
    let args = split_top_level_args(body)
        .iter()
        .map(|a| coerce_arg(a))
        .collect::<JsonwrightResult<Vec<_>>>()?;
    Ok(Some(CallExpr { path, args }))
}

/// Split on commas that sit outside brackets and quotes.
#[must_use]
pub fn split_top_level_args(body: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in body.chars() {
        if let Some(q) = quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                current.push(c);
            }
            '{' | '[' | '(' => {
                depth += 1;
                current.push(c);
            }
            '}' | ']' | ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => args.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    let last = current.trim();
    if !last.is_empty() || !args.is_empty() {
        args.push(last.to_string());
    }
    args
}

/// Coerce one raw argument into a JSON value.
pub fn coerce_arg(raw: &str) -> JsonwrightResult<Value> {
    let s = raw.trim();
    if s.starts_with('{') || s.starts_with('[') {
        if let Ok(v) = serde_json::from_str(s) {
            return Ok(v);
        }
        return serde_json::from_str(&normalize_json_like(s))
            .map_err(|e| JsonwrightError::config(format!("Invalid JSON-like argument {s}: {e}")));
    }
    match s.to_ascii_lowercase().as_str() {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "null" => return Ok(Value::Null),
        _ => {}
    }
    if let Some(n) = parse_number(s) {
        return Ok(Value::Number(n));
    }
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            let inner = &s[1..s.len() - 1];
            return Ok(Value::String(inner.replace(&format!("\\{q}"), &q.to_string())));
        }
    }
    Ok(Value::String(s.to_string()))
}

fn parse_number(s: &str) -> Option<Number> {
    let body = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(i) => (&body[..i], Some(&body[i + 1..])),
        None => (body, None),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (mantissa, None),
    };
    let digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    if !digits(int_part) || frac_part.is_some_and(|f| !digits(f)) {
        return None;
    }
    if let Some(exp) = exponent {
        if !digits(exp.strip_prefix(['+', '-']).unwrap_or(exp)) {
            return None;
        }
    }
    if frac_part.is_none() && exponent.is_none() {
        if let Ok(i) = s.trim_start_matches('+').parse::<i64>() {
            return Some(Number::from(i));
        }
    }
    s.trim_start_matches('+')
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
}

/// Turn `{min: 1, 'max': 'x'}` into strict JSON.
fn normalize_json_like(s: &str) -> String {
    let swapped = s.replace('\'', "\"");
    let chars: Vec<char> = swapped.chars().collect();
    let mut out = String::with_capacity(swapped.len() + 8);
    let mut in_string = false;
    let mut escaped = false;
    let mut expect_key = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                expect_key = false;
                out.push(c);
            }
            '{' | ',' => {
                expect_key = true;
                out.push(c);
            }
            c if c.is_whitespace() => out.push(c),
            c if expect_key && (c.is_alphabetic() || c == '_' || c == '$') => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                let mut j = i;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if chars.get(j) == Some(&':') {
                    out.push('"');
                    out.push_str(&ident);
                    out.push('"');
                } else {
                    out.push_str(&ident);
                }
                expect_key = false;
                continue;
            }
            _ => {
                expect_key = false;
                out.push(c);
            }
        }
        i += 1;
    }
    out
}
