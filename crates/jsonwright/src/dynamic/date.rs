//! `date(...)` directives.
//!
//! Supported forms:
//!
//! ```text
//! date(dd/MM/yyyy)                 random date in [now-3y, now+1y]
//! date(today)                      today at 00:00, yyyy-MM-dd
//! date(today+7, "dd/MM/yyyy")      seven days ahead
//! date(2025-10-05, "dd/MM/yyyy")   fixed base date
//! ```
//!
//! Every format token may carry a signed offset (`dd+2`, `MM-1`, `yyyy+1`).
//! Offsets accumulate per unit over the whole format and are applied once,
//! in the order years, months, days, hours, minutes, seconds, millis.

use super::Locale;
use crate::result::{JsonwrightError, JsonwrightResult};
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rand::Rng;

/// Default output format when a base date is given without one
pub const DEFAULT_FORMAT: &str = "yyyy-MM-dd";

/// Token bases, longest first so `MMMM` wins over `MM` and `M`.
const TOKENS: &[&str] = &[
    "yyyy", "aaaa", "MMMM", "MMM", "SSS", "yy", "aa", "MM", "mm", "dd", "HH", "hh", "ss",
    "AA", "TZ", "M", "m", "d", "H", "h", "s", "a", "Z",
];

/// Clock and rendering settings for one resolution
#[derive(Debug, Clone, Copy)]
pub struct DateEngine {
    /// Current wall-clock time in the rendering timezone
    pub now: NaiveDateTime,
    /// Offset east of UTC in minutes, rendered by `TZ`
    pub offset_minutes: i32,
    /// Month-name locale
    pub locale: Locale,
    /// UTC mode, enables the `Z` suffix
    pub utc: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Token {
        base: &'static str,
        offset: i64,
        raw: String,
    },
}

impl Piece {
    fn raw(&self) -> &str {
        match self {
            Self::Literal(s) => s,
            Self::Token { raw, .. } => raw,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Offsets {
    years: i64,
    months: i64,
    days: i64,
    hours: i64,
    minutes: i64,
    seconds: i64,
    millis: i64,
}

/// Whether `s` starts with a `date(` call, case-insensitively.
#[must_use]
pub fn is_date_call(s: &str) -> bool {
    find_call(s.trim_start()).is_some_and(|(start, _, _)| start == 0)
}

/// Replace every `date(...)` call in `input` with its rendered value.
pub fn resolve_date_calls<R: Rng>(
    input: &str,
    engine: &DateEngine,
    rng: &mut R,
) -> JsonwrightResult<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some((start, inner, end)) = find_call(rest) {
        out.push_str(&rest[..start]);
        out.push_str(&render_directive(inner, engine, rng)?);
        rest = &rest[end..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Locate the next `date(<inner>)`; returns (start, inner, end-exclusive).
fn find_call(s: &str) -> Option<(usize, &str, usize)> {
    let lower = s.to_ascii_lowercase();
    let mut from = 0;
    while let Some(pos) = lower[from..].find("date") {
        let start = from + pos;
        let after = &s[start + 4..];
        let open = after.len() - after.trim_start().len();
        if after[open..].starts_with('(') {
            let body_start = start + 4 + open + 1;
            if let Some(close) = s[body_start..].find(')') {
                if close > 0 {
                    let inner = &s[body_start..body_start + close];
                    return Some((start, inner, body_start + close + 1));
                }
            }
        }
        from = start + 4;
    }
    None
}

fn render_directive<R: Rng>(
    inner: &str,
    engine: &DateEngine,
    rng: &mut R,
) -> JsonwrightResult<String> {
    let (base_part, format_part) = match inner.split_once(',') {
        Some((b, f)) => (b.trim(), Some(unquote(f.trim()))),
        None => (inner.trim(), None),
    };
    if let Some(base) = parse_base(base_part, engine)? {
        let format = format_part.unwrap_or(DEFAULT_FORMAT);
        return format_date(base, format, engine);
    }
    let base = random_date(engine, rng);
    format_date(base, unquote(inner.trim()), engine)
}

fn unquote(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &s[1..s.len() - 1];
        }
    }
    s
}

fn parse_base(raw: &str, engine: &DateEngine) -> JsonwrightResult<Option<NaiveDateTime>> {
    let lower = raw.to_ascii_lowercase();
    if let Some(rest) = lower.strip_prefix("today") {
        let rest: String = rest.chars().filter(|c| !c.is_whitespace()).collect();
        let days = if rest.is_empty() {
            0
        } else if rest.starts_with(['+', '-']) && rest.len() > 1 {
            rest.parse::<i64>()
                .map_err(|_| JsonwrightError::config(format!("invalid day offset in date({raw})")))?
        } else {
            return Ok(None);
        };
        let day = Duration::try_days(days)
            .and_then(|delta| engine.now.date().checked_add_signed(delta))
            .ok_or_else(|| out_of_range(raw))?;
        return Ok(Some(day.and_time(NaiveTime::MIN)));
    }
    if is_iso_day(raw) {
        let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| JsonwrightError::config(format!("invalid date '{raw}': {e}")))?;
        return Ok(Some(day.and_time(NaiveTime::MIN)));
    }
    Ok(None)
}

fn is_iso_day(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b[4] == b'-'
        && b[7] == b'-'
        && b.iter()
            .enumerate()
            .all(|(i, c)| i == 4 || i == 7 || c.is_ascii_digit())
}

fn random_date<R: Rng>(engine: &DateEngine, rng: &mut R) -> NaiveDateTime {
    let start = engine
        .now
        .checked_sub_months(Months::new(36))
        .unwrap_or(engine.now);
    let end = engine
        .now
        .checked_add_months(Months::new(12))
        .unwrap_or(engine.now);
    let span = (end - start).num_milliseconds().max(0);
    start + Duration::milliseconds(rng.gen_range(0..=span))
}

fn tokenize(format: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut rest = format;
    while !rest.is_empty() {
        if let Some(base) = TOKENS.iter().copied().find(|t| rest.starts_with(t)) {
            let after = &rest[base.len()..];
            let offset_len = signed_int_len(after);
            let offset = after[..offset_len].parse::<i64>().unwrap_or(0);
            if !literal.is_empty() {
                pieces.push(Piece::Literal(std::mem::take(&mut literal)));
            }
            pieces.push(Piece::Token {
                base,
                offset,
                raw: rest[..base.len() + offset_len].to_string(),
            });
            rest = &after[offset_len..];
        } else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                literal.push(c);
            }
            rest = chars.as_str();
        }
    }
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    pieces
}

fn signed_int_len(s: &str) -> usize {
    let b = s.as_bytes();
    if !matches!(b.first(), Some(b'+' | b'-')) {
        return 0;
    }
    let digits = b[1..].iter().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        0
    } else {
        1 + digits
    }
}

const fn is_hour(base: &str) -> bool {
    matches!(base.as_bytes(), [b'H'] | [b'H', b'H'] | [b'h'] | [b'h', b'h'])
}

const fn is_month_or_minute(base: &str) -> bool {
    matches!(base.as_bytes(), [b'M'] | [b'M', b'M'] | [b'm'] | [b'm', b'm'])
}

/// Minute if an hour token came earlier or a neighbour touches a `:`.
fn reads_as_minutes(pieces: &[Piece], index: usize, seen_hour: bool) -> bool {
    if seen_hour {
        return true;
    }
    let prev = index
        .checked_sub(1)
        .and_then(|i| pieces.get(i))
        .and_then(|p| p.raw().chars().last());
    let next = pieces.get(index + 1).and_then(|p| p.raw().chars().next());
    prev == Some(':') || next == Some(':')
}

fn collect_offsets(pieces: &[Piece]) -> Offsets {
    let mut offsets = Offsets::default();
    let mut seen_hour = false;
    for (i, piece) in pieces.iter().enumerate() {
        let Piece::Token { base, offset, .. } = piece else {
            continue;
        };
        let slot = match *base {
            "yyyy" | "aaaa" | "yy" | "aa" => &mut offsets.years,
            "MMMM" | "MMM" => &mut offsets.months,
            "dd" | "d" => &mut offsets.days,
            "SSS" => &mut offsets.millis,
            "ss" | "s" => &mut offsets.seconds,
            b if is_hour(b) => {
                seen_hour = true;
                &mut offsets.hours
            }
            b if is_month_or_minute(b) => {
                if reads_as_minutes(pieces, i, seen_hour) {
                    &mut offsets.minutes
                } else {
                    &mut offsets.months
                }
            }
            _ => continue,
        };
        *slot = slot.saturating_add(*offset);
    }
    offsets
}

fn out_of_range(directive: &str) -> JsonwrightError {
    JsonwrightError::config(format!("date offset out of range in '{directive}'"))
}

fn shift_months(date: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        date.checked_add_months(magnitude)
    } else {
        date.checked_sub_months(magnitude)
    }
}

fn shift(date: NaiveDateTime, delta: Option<Duration>) -> Option<NaiveDateTime> {
    date.checked_add_signed(delta?)
}

fn apply_offsets(date: NaiveDateTime, o: Offsets) -> Option<NaiveDateTime> {
    let mut d = shift_months(date, o.years.checked_mul(12)?)?;
    d = shift_months(d, o.months)?;
    d = shift(d, Duration::try_days(o.days))?;
    d = shift(d, Duration::try_hours(o.hours))?;
    d = shift(d, Duration::try_minutes(o.minutes))?;
    d = shift(d, Duration::try_seconds(o.seconds))?;
    shift(d, Duration::try_milliseconds(o.millis))
}

fn format_offset(minutes: i32) -> String {
    let sign = if minutes >= 0 { '+' } else { '-' };
    let abs = minutes.unsigned_abs();
    format!("{sign}{:02}{:02}", abs / 60, abs % 60)
}

/// Render `base` with `format`, applying every inline token offset.
///
/// Fails when the accumulated offsets leave the representable range.
pub fn format_date(
    base: NaiveDateTime,
    format: &str,
    engine: &DateEngine,
) -> JsonwrightResult<String> {
    let pieces = tokenize(format);
    let d = apply_offsets(base, collect_offsets(&pieces)).ok_or_else(|| out_of_range(format))?;
    let hour12 = match d.hour() % 12 {
        0 => 12,
        h => h,
    };
    let pm = d.hour() >= 12;

    let mut out = String::new();
    let mut seen_hour = false;
    for (i, piece) in pieces.iter().enumerate() {
        let base = match piece {
            Piece::Literal(s) => {
                out.push_str(s);
                continue;
            }
            Piece::Token { base, .. } => *base,
        };
        let rendered = match base {
            "yyyy" | "aaaa" => format!("{:04}", d.year()),
            "yy" | "aa" => format!("{:02}", d.year().rem_euclid(100)),
            "MMMM" => engine.locale.month_name(d.month0(), true).to_string(),
            "MMM" => engine.locale.month_name(d.month0(), false).to_string(),
            "dd" => format!("{:02}", d.day()),
            "d" => d.day().to_string(),
            "HH" => format!("{:02}", d.hour()),
            "H" => d.hour().to_string(),
            "hh" => format!("{hour12:02}"),
            "h" => hour12.to_string(),
            "a" => (if pm { "pm" } else { "am" }).to_string(),
            "AA" => (if pm { "PM" } else { "AM" }).to_string(),
            "ss" => format!("{:02}", d.second()),
            "s" => d.second().to_string(),
            "SSS" => format!("{:03}", d.nanosecond() / 1_000_000 % 1000),
            "TZ" => format_offset(engine.offset_minutes),
            "Z" => (if engine.utc { "Z" } else { "" }).to_string(),
            b => {
                let value = if reads_as_minutes(&pieces, i, seen_hour) {
                    d.minute()
                } else {
                    d.month()
                };
                if b.len() == 2 {
                    format!("{value:02}")
                } else {
                    value.to_string()
                }
            }
        };
        if is_hour(base) {
            seen_hour = true;
        }
        out.push_str(&rendered);
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn engine() -> DateEngine {
        DateEngine {
            now: NaiveDate::from_ymd_opt(2024, 3, 15)
                .unwrap()
                .and_hms_milli_opt(14, 7, 9, 42)
                .unwrap(),
            offset_minutes: -180,
            locale: Locale::PtBr,
            utc: false,
        }
    }

    fn resolve(input: &str) -> String {
        let mut rng = StdRng::seed_from_u64(7);
        resolve_date_calls(input, &engine(), &mut rng).unwrap()
    }

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 5)
            .unwrap()
            .and_hms_opt(9, 5, 3)
            .unwrap()
    }

    mod directive_tests {
        use super::*;

        #[test]
        fn test_fixed_base_with_format() {
            assert_eq!(resolve(r#"date(2025-10-05, "dd/MM/yyyy")"#), "05/10/2025");
        }

        #[test]
        fn test_today_default_format() {
            assert_eq!(resolve("date(today)"), "2024-03-15");
            assert_eq!(resolve(r#"date(today, "yyyy-MM-dd")"#), "2024-03-15");
        }

        #[test]
        fn test_today_offset_zeroes_time() {
            assert_eq!(
                resolve(r#"date(today+7, "yyyy-MM-dd HH:mm:ss")"#),
                "2024-03-22 00:00:00"
            );
            assert_eq!(resolve("date(today - 15)"), "2024-02-29");
        }

        #[test]
        fn test_random_date_matches_shape() {
            let out = resolve("date(dd/MM/yyyy)");
            let parts: Vec<&str> = out.split('/').collect();
            assert_eq!(parts.len(), 3);
            assert_eq!(parts[0].len(), 2);
            assert_eq!(parts[1].len(), 2);
            assert_eq!(parts[2].len(), 4);
            let year: i32 = parts[2].parse().unwrap();
            assert!((2021..=2025).contains(&year));
        }

        #[test]
        fn test_calls_embedded_in_text() {
            assert_eq!(
                resolve("date(2025-01-02, 'dd/MM') and date(today, \"yy\")"),
                "02/01 and 24"
            );
        }

        #[test]
        fn test_detection() {
            assert!(is_date_call("date(today)"));
            assert!(is_date_call("  DATE (today)"));
            assert!(!is_date_call("update(today)"));
            assert!(!is_date_call("due date(today)"));
        }

        #[test]
        fn test_out_of_range_offsets_are_errors() {
            let mut rng = StdRng::seed_from_u64(1);
            for directive in [
                "date(today+99999999)",
                "date(today, \"dd+99999999/MM/yyyy\")",
                "date(today, \"yyyy+999999999\")",
                "date(2025-01-01, \"HH+9223372036854775807\")",
            ] {
                let err = resolve_date_calls(directive, &engine(), &mut rng).unwrap_err();
                assert!(err.to_string().contains("out of range"), "{directive}: {err}");
            }
        }

        #[test]
        fn test_invalid_iso_base_is_error() {
            let mut rng = StdRng::seed_from_u64(1);
            assert!(resolve_date_calls("date(2025-13-40)", &engine(), &mut rng).is_err());
        }
    }

    mod format_tests {
        use super::*;

        #[test]
        fn test_colon_means_minutes() {
            assert_eq!(format_date(base(), "HH:mm", &engine()).unwrap(), "09:05");
            assert_eq!(format_date(base(), "mm:ss", &engine()).unwrap(), "05:03");
        }

        #[test]
        fn test_month_default() {
            assert_eq!(format_date(base(), "MM/dd/yyyy", &engine()).unwrap(), "10/05/2025");
            assert_eq!(format_date(base(), "dd-mm-yyyy", &engine()).unwrap(), "05-10-2025");
        }

        #[test]
        fn test_hour_seen_switches_to_minutes() {
            assert_eq!(format_date(base(), "H'h'mm", &engine()).unwrap(), "9'9'05");
            assert_eq!(format_date(base(), "HH mm", &engine()).unwrap(), "09 05");
        }

        #[test]
        fn test_offsets_accumulate() {
            assert_eq!(format_date(base(), "yyyy+1-MM-2-dd", &engine()).unwrap(), "2026-08-05");
            assert_eq!(format_date(base(), "MM-2-yyyy+1-dd", &engine()).unwrap(), "08-2026-05");
            assert_eq!(format_date(base(), "dd+1/dd+1", &engine()).unwrap(), "07/07");
        }

        #[test]
        fn test_twelve_hour_clock() {
            let midnight = NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap();
            assert_eq!(format_date(midnight, "hh:mm a", &engine()).unwrap(), "12:00 am");
            let evening = midnight + Duration::hours(19);
            assert_eq!(format_date(evening, "h AA", &engine()).unwrap(), "7 PM");
        }

        #[test]
        fn test_month_names_follow_locale() {
            assert_eq!(format_date(base(), "d MMMM", &engine()).unwrap(), "5 outubro");
            let en = DateEngine {
                locale: Locale::EnUs,
                ..engine()
            };
            assert_eq!(format_date(base(), "MMM d", &en).unwrap(), "Oct 5");
        }

        #[test]
        fn test_timezone_tokens() {
            assert_eq!(format_date(base(), "HH:mmTZ", &engine()).unwrap(), "09:05-0300");
            assert_eq!(format_date(base(), "HH:mmZ", &engine()).unwrap(), "09:05");
            let utc = DateEngine {
                utc: true,
                offset_minutes: 0,
                ..engine()
            };
            assert_eq!(format_date(base(), "HH:mmZ", &utc).unwrap(), "09:05Z");
            assert_eq!(format_date(base(), "TZ", &utc).unwrap(), "+0000");
        }

        #[test]
        fn test_millis_and_short_year() {
            let d = base() + Duration::milliseconds(7);
            assert_eq!(format_date(d, "yy.SSS", &engine()).unwrap(), "25.007");
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_random_dates_keep_shape(seed in any::<u64>()) {
                let mut rng = StdRng::seed_from_u64(seed);
                let out = resolve_date_calls("date(dd/MM/yyyy)", &engine(), &mut rng).unwrap();
                prop_assert_eq!(out.len(), 10);
                prop_assert!(out.chars().enumerate().all(|(i, c)| if i == 2 || i == 5 { c == '/' } else { c.is_ascii_digit() }), "unexpected date shape: {}", out);
            }

            #[test]
            fn prop_day_offsets_shift_exactly(days in -400i64..400) {
                let directive = format!("date(today{days:+}, \"yyyy-MM-dd\")");
                let expected = (engine().now.date() + Duration::days(days)).format("%Y-%m-%d").to_string();
                prop_assert_eq!(resolve(&directive), expected);
            }
        }
    }
}
