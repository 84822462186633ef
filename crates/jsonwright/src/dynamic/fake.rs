//! Fixed fake-data table.
//!
//! Each entry maps a dotted path (`internet.email`) to a plain function.
//! Arguments arrive already coerced to JSON; unknown or malformed
//! arguments fall back to defaults instead of failing.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Value produced by a table entry
#[derive(Debug, Clone, PartialEq)]
pub enum FakeValue {
    /// Plain JSON value
    Json(Value),
    /// Point in time, rendered as ISO-8601
    Date(DateTime<Utc>),
}

impl FakeValue {
    /// Render the value as directive output.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Date(d) => d.to_rfc3339_opts(SecondsFormat::Millis, true),
            Self::Json(Value::String(s)) => s.clone(),
            Self::Json(other) => other.to_string(),
        }
    }
}

impl From<Value> for FakeValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<String> for FakeValue {
    fn from(value: String) -> Self {
        Self::Json(Value::String(value))
    }
}

/// Mutable state handed to table functions
#[derive(Debug)]
pub struct FakeCtx<'a> {
    /// Random source
    pub rng: &'a mut StdRng,
    /// Reference time for relative dates
    pub now: DateTime<Utc>,
}

type FakeFn = fn(&mut FakeCtx<'_>, &[Value]) -> FakeValue;

/// Lookup table of fake-data generators
#[derive(Debug)]
pub struct FakeProvider {
    table: HashMap<&'static str, FakeFn>,
}

const FIRST_NAMES: &[&str] = &[
    "Ana", "Bruno", "Carla", "Daniel", "Elena", "Felipe", "Gabriela", "Hugo", "Isabela",
    "João", "Laura", "Marcos", "Natália", "Otávio", "Paula", "Rafael", "Sofia", "Tiago",
    "Alice", "Ben", "Chloe", "David", "Emma", "Frank", "Grace", "Henry", "Olivia", "Liam",
];
const LAST_NAMES: &[&str] = &[
    "Silva", "Santos", "Oliveira", "Souza", "Pereira", "Costa", "Almeida", "Ribeiro",
    "Carvalho", "Gomes", "Martins", "Rocha", "Smith", "Johnson", "Brown", "Taylor",
    "Miller", "Wilson", "Moore", "Clark",
];
const JOB_TITLES: &[&str] = &[
    "Software Engineer", "Product Manager", "QA Analyst", "Designer", "Data Scientist",
    "Support Specialist", "Account Executive", "Operations Lead",
];
const EMAIL_DOMAINS: &[&str] = &["example.com", "example.org", "example.net", "test.dev"];
const TLDS: &[&str] = &["com", "org", "net", "io", "dev", "com.br"];
const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed",
    "do", "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna",
    "aliqua", "enim", "minim", "veniam", "quis", "nostrud", "exercitation", "ullamco",
];
const CITIES: &[&str] = &[
    "São Paulo", "Rio de Janeiro", "Belo Horizonte", "Curitiba", "Recife", "Porto Alegre",
    "Lisbon", "Boston", "Austin", "Denver", "Toronto", "Madrid",
];
const COUNTRIES: &[&str] = &[
    "Brazil", "Portugal", "United States", "Canada", "Spain", "Argentina", "Chile", "Mexico",
];
const STREETS: &[&str] = &[
    "Rua das Flores", "Avenida Paulista", "Main Street", "Oak Avenue", "Rua Augusta",
    "Elm Street", "Avenida Brasil", "Maple Drive",
];
const COMPANY_SUFFIXES: &[&str] = &["Ltda", "S.A.", "Inc", "LLC", "Group", "Labs"];
const ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NUMERIC: &[u8] = b"0123456789";
const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn string_from(rng: &mut StdRng, alphabet: &[u8], len: usize) -> String {
    (0..len)
        .filter_map(|_| alphabet.choose(rng).map(|b| char::from(*b)))
        .collect()
}

/// Numeric option given either positionally or as `{key: n}`.
fn num_arg(args: &[Value], key: &str) -> Option<f64> {
    match args.first() {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::Object(map)) => map.get(key).and_then(Value::as_f64),
        _ => None,
    }
}

fn obj_arg<'a>(args: &'a [Value], key: &str) -> Option<&'a Value> {
    args.first()
        .and_then(Value::as_object)
        .and_then(|m| m.get(key))
}

fn len_arg(args: &[Value], default: usize) -> usize {
    num_arg(args, "length").map_or(default, |n| n.max(0.0) as usize)
}

fn slug(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

fn first_name(ctx: &mut FakeCtx<'_>, _: &[Value]) -> FakeValue {
    pick(ctx.rng, FIRST_NAMES).to_string().into()
}

fn last_name(ctx: &mut FakeCtx<'_>, _: &[Value]) -> FakeValue {
    pick(ctx.rng, LAST_NAMES).to_string().into()
}

fn full_name(ctx: &mut FakeCtx<'_>, _: &[Value]) -> FakeValue {
    let first = pick(ctx.rng, FIRST_NAMES);
    let last = pick(ctx.rng, LAST_NAMES);
    format!("{first} {last}").into()
}

fn job_title(ctx: &mut FakeCtx<'_>, _: &[Value]) -> FakeValue {
    pick(ctx.rng, JOB_TITLES).to_string().into()
}

fn sex(ctx: &mut FakeCtx<'_>, _: &[Value]) -> FakeValue {
    (if ctx.rng.gen_bool(0.5) { "female" } else { "male" })
        .to_string()
        .into()
}

fn username(ctx: &mut FakeCtx<'_>, args: &[Value]) -> FakeValue {
    let first = obj_arg(args, "firstName")
        .and_then(Value::as_str)
        .map_or_else(|| pick(ctx.rng, FIRST_NAMES).to_string(), str::to_string);
    let last = obj_arg(args, "lastName")
        .and_then(Value::as_str)
        .map_or_else(|| pick(ctx.rng, LAST_NAMES).to_string(), str::to_string);
    let sep = pick(ctx.rng, &[".", "_", ""]);
    let n: u16 = ctx.rng.gen_range(1..1000);
    format!("{}{sep}{}{n}", slug(&first), slug(&last)).into()
}

fn email(ctx: &mut FakeCtx<'_>, args: &[Value]) -> FakeValue {
    let user = username(ctx, args).render();
    let domain = obj_arg(args, "provider")
        .and_then(Value::as_str)
        .map_or_else(|| pick(ctx.rng, EMAIL_DOMAINS).to_string(), str::to_string);
    format!("{user}@{domain}").into()
}

fn password(ctx: &mut FakeCtx<'_>, args: &[Value]) -> FakeValue {
    let len = len_arg(args, 15);
    string_from(ctx.rng, ALPHANUMERIC, len).into()
}

fn domain_name(ctx: &mut FakeCtx<'_>, _: &[Value]) -> FakeValue {
    let word = pick(ctx.rng, WORDS);
    let tld = pick(ctx.rng, TLDS);
    format!("{word}-{}.{tld}", pick(ctx.rng, WORDS)).into()
}

fn url(ctx: &mut FakeCtx<'_>, args: &[Value]) -> FakeValue {
    let domain = domain_name(ctx, args).render();
    format!("https://{domain}").into()
}

fn ipv4(ctx: &mut FakeCtx<'_>, _: &[Value]) -> FakeValue {
    let octets: [u8; 4] = ctx.rng.gen();
    format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3]).into()
}

fn uuid_v4(ctx: &mut FakeCtx<'_>, _: &[Value]) -> FakeValue {
    let bytes: [u8; 16] = ctx.rng.gen();
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .to_string()
        .into()
}

fn alpha(ctx: &mut FakeCtx<'_>, args: &[Value]) -> FakeValue {
    let len = len_arg(args, 1);
    string_from(ctx.rng, ALPHA, len).into()
}

fn numeric(ctx: &mut FakeCtx<'_>, args: &[Value]) -> FakeValue {
    let len = len_arg(args, 1);
    string_from(ctx.rng, NUMERIC, len).into()
}

fn alphanumeric(ctx: &mut FakeCtx<'_>, args: &[Value]) -> FakeValue {
    let len = len_arg(args, 1);
    string_from(ctx.rng, ALPHANUMERIC, len).into()
}

fn bounds(args: &[Value], default_max: f64) -> (f64, f64) {
    let (min, max) = match args.first() {
        Some(Value::Number(n)) => (0.0, n.as_f64().unwrap_or(default_max)),
        Some(Value::Object(_)) => (
            obj_arg(args, "min").and_then(Value::as_f64).unwrap_or(0.0),
            obj_arg(args, "max").and_then(Value::as_f64).unwrap_or(default_max),
        ),
        _ => (0.0, default_max),
    };
    if min <= max {
        (min, max)
    } else {
        (max, min)
    }
}

fn int(ctx: &mut FakeCtx<'_>, args: &[Value]) -> FakeValue {
    let (min, max) = bounds(args, 99_999.0);
    let value = ctx.rng.gen_range(min.ceil() as i64..=max.floor().max(min.ceil()) as i64);
    json!(value).into()
}

fn float(ctx: &mut FakeCtx<'_>, args: &[Value]) -> FakeValue {
    let (min, max) = bounds(args, 1.0);
    let digits = obj_arg(args, "fractionDigits")
        .and_then(Value::as_u64)
        .unwrap_or(2)
        .min(10) as i32;
    let raw = if max > min {
        ctx.rng.gen_range(min..max)
    } else {
        min
    };
    let scale = 10f64.powi(digits);
    json!((raw * scale).round() / scale).into()
}

fn boolean(ctx: &mut FakeCtx<'_>, _: &[Value]) -> FakeValue {
    json!(ctx.rng.gen_bool(0.5)).into()
}

fn word(ctx: &mut FakeCtx<'_>, _: &[Value]) -> FakeValue {
    pick(ctx.rng, WORDS).to_string().into()
}

fn word_list(ctx: &mut FakeCtx<'_>, count: usize) -> Vec<&'static str> {
    (0..count).map(|_| pick(ctx.rng, WORDS)).collect()
}

fn words(ctx: &mut FakeCtx<'_>, args: &[Value]) -> FakeValue {
    let count = num_arg(args, "count").map_or(3, |n| n.max(1.0) as usize);
    word_list(ctx, count).join(" ").into()
}

fn sentence_text(ctx: &mut FakeCtx<'_>, count: usize) -> String {
    let mut text = word_list(ctx, count).join(" ");
    if let Some(first) = text.get(..1) {
        let upper = first.to_uppercase();
        text.replace_range(..1, &upper);
    }
    text.push('.');
    text
}

fn sentence(ctx: &mut FakeCtx<'_>, args: &[Value]) -> FakeValue {
    let count = num_arg(args, "wordCount").map_or_else(|| ctx.rng.gen_range(5..10), |n| n.max(1.0) as usize);
    sentence_text(ctx, count).into()
}

fn paragraph(ctx: &mut FakeCtx<'_>, args: &[Value]) -> FakeValue {
    let count = num_arg(args, "sentenceCount").map_or(3, |n| n.max(1.0) as usize);
    (0..count)
        .map(|_| {
            let n = ctx.rng.gen_range(5..10);
            sentence_text(ctx, n)
        })
        .collect::<Vec<_>>()
        .join(" ")
        .into()
}

fn city(ctx: &mut FakeCtx<'_>, _: &[Value]) -> FakeValue {
    pick(ctx.rng, CITIES).to_string().into()
}

fn country(ctx: &mut FakeCtx<'_>, _: &[Value]) -> FakeValue {
    pick(ctx.rng, COUNTRIES).to_string().into()
}

fn street_address(ctx: &mut FakeCtx<'_>, _: &[Value]) -> FakeValue {
    let number: u16 = ctx.rng.gen_range(1..3000);
    format!("{}, {number}", pick(ctx.rng, STREETS)).into()
}

fn zip_code(ctx: &mut FakeCtx<'_>, _: &[Value]) -> FakeValue {
    let head = string_from(ctx.rng, NUMERIC, 5);
    let tail = string_from(ctx.rng, NUMERIC, 3);
    format!("{head}-{tail}").into()
}

fn phone_number(ctx: &mut FakeCtx<'_>, _: &[Value]) -> FakeValue {
    let area: u8 = ctx.rng.gen_range(11..100);
    let head = string_from(ctx.rng, NUMERIC, 4);
    let tail = string_from(ctx.rng, NUMERIC, 4);
    format!("({area}) 9{head}-{tail}").into()
}

fn company_name(ctx: &mut FakeCtx<'_>, _: &[Value]) -> FakeValue {
    let last = pick(ctx.rng, LAST_NAMES);
    let suffix = pick(ctx.rng, COMPANY_SUFFIXES);
    format!("{last} {suffix}").into()
}

/// Widest relative span, a thousand years
const MAX_SPAN_DAYS: f64 = 365_000.0;

fn days_arg(args: &[Value], key: &str, default: f64) -> f64 {
    num_arg(args, key).unwrap_or(default).max(0.0)
}

fn offset_date(ctx: &mut FakeCtx<'_>, max_days: f64, forward: bool) -> FakeValue {
    let max_ms = (max_days.min(MAX_SPAN_DAYS) * 86_400_000.0) as i64;
    let ms = ctx.rng.gen_range(1..=max_ms.max(1));
    let delta = Duration::milliseconds(ms);
    let shifted = if forward {
        ctx.now.checked_add_signed(delta)
    } else {
        ctx.now.checked_sub_signed(delta)
    };
    FakeValue::Date(shifted.unwrap_or(ctx.now))
}

fn past(ctx: &mut FakeCtx<'_>, args: &[Value]) -> FakeValue {
    offset_date(ctx, days_arg(args, "years", 1.0) * 365.0, false)
}

fn future(ctx: &mut FakeCtx<'_>, args: &[Value]) -> FakeValue {
    offset_date(ctx, days_arg(args, "years", 1.0) * 365.0, true)
}

fn recent(ctx: &mut FakeCtx<'_>, args: &[Value]) -> FakeValue {
    offset_date(ctx, days_arg(args, "days", 1.0), false)
}

fn soon(ctx: &mut FakeCtx<'_>, args: &[Value]) -> FakeValue {
    offset_date(ctx, days_arg(args, "days", 1.0), true)
}

fn birthdate(ctx: &mut FakeCtx<'_>, _: &[Value]) -> FakeValue {
    let years: i64 = ctx.rng.gen_range(18..80);
    let days: i64 = ctx.rng.gen_range(0..365);
    let age = Duration::days(years * 365 + days);
    FakeValue::Date(ctx.now.checked_sub_signed(age).unwrap_or(ctx.now))
}

fn array_element(ctx: &mut FakeCtx<'_>, args: &[Value]) -> FakeValue {
    args.first()
        .and_then(Value::as_array)
        .and_then(|items| items.choose(ctx.rng).cloned())
        .unwrap_or(Value::Null)
        .into()
}

impl FakeProvider {
    /// Build the full table.
    #[must_use]
    pub fn load() -> Self {
        let entries: &[(&'static str, FakeFn)] = &[
            ("person.firstName", first_name),
            ("person.lastName", last_name),
            ("person.fullName", full_name),
            ("person.jobTitle", job_title),
            ("person.sex", sex),
            ("internet.email", email),
            ("internet.userName", username),
            ("internet.username", username),
            ("internet.password", password),
            ("internet.url", url),
            ("internet.domainName", domain_name),
            ("internet.ipv4", ipv4),
            ("string.uuid", uuid_v4),
            ("string.alpha", alpha),
            ("string.numeric", numeric),
            ("string.alphanumeric", alphanumeric),
            ("number.int", int),
            ("number.float", float),
            ("datatype.boolean", boolean),
            ("lorem.word", word),
            ("lorem.words", words),
            ("lorem.sentence", sentence),
            ("lorem.paragraph", paragraph),
            ("location.city", city),
            ("location.country", country),
            ("location.streetAddress", street_address),
            ("location.zipCode", zip_code),
            ("phone.number", phone_number),
            ("company.name", company_name),
            ("date.past", past),
            ("date.future", future),
            ("date.recent", recent),
            ("date.soon", soon),
            ("date.birthdate", birthdate),
            ("helpers.arrayElement", array_element),
        ];
        Self {
            table: entries.iter().copied().collect(),
        }
    }

    /// Whether the dotted path names a generator
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.table.contains_key(path)
    }

    /// Invoke a generator; `None` for unknown paths.
    pub fn call(&self, path: &str, ctx: &mut FakeCtx<'_>, args: &[Value]) -> Option<FakeValue> {
        self.table.get(path).map(|f| f(ctx, args))
    }

    /// All registered paths, sorted
    #[must_use]
    pub fn paths(&self) -> Vec<&'static str> {
        let mut paths: Vec<_> = self.table.keys().copied().collect();
        paths.sort_unstable();
        paths
    }
}
