//! Dynamic values.
//!
//! Action text fields such as `type` may hold a directive instead of a
//! literal:
//!
//! ```text
//! date(today+7, "dd/MM/yyyy")   -> 22/03/2024
//! faker.internet.email()        -> bruno.silva412@example.com
//! plain text                    -> plain text
//! ```
//!
//! Date directives are rendered by [`date`]; fake-data calls are parsed by
//! [`call`] and dispatched to the fixed table in [`fake`], which is built on
//! first use.

pub mod call;
pub mod date;
pub mod fake;

use crate::result::{JsonwrightError, JsonwrightResult};
use chrono::{DateTime, FixedOffset, Local, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::debug;

use self::date::DateEngine;
use self::fake::{FakeCtx, FakeProvider};

/// Month-name locale for `MMMM` / `MMM`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    /// Brazilian Portuguese
    #[default]
    PtBr,
    /// US English
    EnUs,
}

const PT_BR_LONG: [&str; 12] = [
    "janeiro", "fevereiro", "março", "abril", "maio", "junho", "julho", "agosto",
    "setembro", "outubro", "novembro", "dezembro",
];
const PT_BR_SHORT: [&str; 12] = [
    "jan.", "fev.", "mar.", "abr.", "mai.", "jun.", "jul.", "ago.", "set.", "out.", "nov.",
    "dez.",
];
const EN_US_LONG: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];
const EN_US_SHORT: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

impl Locale {
    /// Month name for a zero-based month index
    #[must_use]
    pub fn month_name(self, month0: u32, long: bool) -> &'static str {
        let names = match (self, long) {
            (Self::PtBr, true) => &PT_BR_LONG,
            (Self::PtBr, false) => &PT_BR_SHORT,
            (Self::EnUs, true) => &EN_US_LONG,
            (Self::EnUs, false) => &EN_US_SHORT,
        };
        names.get(month0 as usize).copied().unwrap_or_default()
    }

    /// BCP 47 tag
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::PtBr => "pt-BR",
            Self::EnUs => "en-US",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Locale {
    type Err = JsonwrightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "pt-br" | "pt" => Ok(Self::PtBr),
            "en-us" | "en" => Ok(Self::EnUs),
            other => Err(JsonwrightError::config(format!(
                "unsupported locale '{other}' (expected pt-BR or en-US)"
            ))),
        }
    }
}

/// Settings for dynamic value resolution
#[derive(Debug, Clone, Default)]
pub struct DynamicOptions {
    /// Month-name locale
    pub locale: Locale,
    /// Render dates in UTC
    pub utc: bool,
    /// Seed for reproducible random values
    pub seed: Option<u64>,
    /// Fixed "now"; the system clock when unset
    pub now: Option<DateTime<FixedOffset>>,
}

impl DynamicOptions {
    /// Create default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the locale
    #[must_use]
    pub const fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Enable UTC rendering
    #[must_use]
    pub const fn with_utc(mut self, utc: bool) -> Self {
        self.utc = utc;
        self
    }

    /// Seed the random source
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Pin the clock
    #[must_use]
    pub const fn with_now(mut self, now: DateTime<FixedOffset>) -> Self {
        self.now = Some(now);
        self
    }
}

/// Resolves `date(...)` and `faker.*(...)` directives to literal strings
#[derive(Debug)]
pub struct DynamicResolver {
    options: DynamicOptions,
    rng: Mutex<StdRng>,
    provider: OnceCell<FakeProvider>,
}

impl Default for DynamicResolver {
    fn default() -> Self {
        Self::new(DynamicOptions::default())
    }
}

impl DynamicResolver {
    /// Create a resolver
    #[must_use]
    pub fn new(options: DynamicOptions) -> Self {
        let rng = options
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            options,
            rng: Mutex::new(rng),
            provider: OnceCell::new(),
        }
    }

    fn now(&self) -> DateTime<FixedOffset> {
        self.options
            .now
            .unwrap_or_else(|| Local::now().fixed_offset())
    }

    fn date_engine(&self) -> DateEngine {
        let now = self.now();
        if self.options.utc {
            DateEngine {
                now: now.naive_utc(),
                offset_minutes: now.offset().local_minus_utc() / 60,
                locale: self.options.locale,
                utc: true,
            }
        } else {
            DateEngine {
                now: now.naive_local(),
                offset_minutes: now.offset().local_minus_utc() / 60,
                locale: self.options.locale,
                utc: false,
            }
        }
    }

    /// Resolve `text` to a literal. Non-directive input is returned as is.
    pub async fn resolve(&self, text: &str) -> JsonwrightResult<String> {
        let trimmed = text.trim();
        if date::is_date_call(trimmed) {
            let engine = self.date_engine();
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            let out = date::resolve_date_calls(trimmed, &engine, &mut *rng)?;
            debug!(input = trimmed, output = %out, "resolved date directive");
            return Ok(out);
        }

        let Some(expr) = call::parse_call(trimmed)? else {
            return Ok(text.to_string());
        };
        let provider = self
            .provider
            .get_or_init(|| async { FakeProvider::load() })
            .await;
        let key = expr.key();
        if !provider.contains(&key) {
            return Err(JsonwrightError::InvalidDynamicPath {
                path: format!("{}()", expr.display_path()),
            });
        }
        let now = self.now().with_timezone(&Utc);
        let value = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            let mut ctx = FakeCtx { rng: &mut *rng, now };
            provider.call(&key, &mut ctx, &expr.args)
        };
        let out = value.map(|v| v.render()).ok_or_else(|| JsonwrightError::InvalidDynamicPath {
            path: expr.display_path(),
        })?;
        debug!(path = %expr.display_path(), output = %out, "resolved fake-data call");
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn resolver() -> DynamicResolver {
        let now = FixedOffset::west_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 15, 14, 7, 9)
            .unwrap();
        DynamicResolver::new(DynamicOptions::new().with_seed(42).with_now(now))
    }

    #[tokio::test]
    async fn test_literal_passthrough() {
        assert_eq!(resolver().resolve("  hello world ").await.unwrap(), "  hello world ");
    }

    #[tokio::test]
    async fn test_date_directive() {
        let r = resolver();
        assert_eq!(r.resolve("date(today)").await.unwrap(), "2024-03-15");
        assert_eq!(
            r.resolve(r#" date(2025-10-05, "dd/MM/yyyy") "#).await.unwrap(),
            "05/10/2025"
        );
    }

    #[tokio::test]
    async fn test_utc_mode_shifts_clock() {
        let now = FixedOffset::west_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 15, 22, 0, 0)
            .unwrap();
        let r = DynamicResolver::new(DynamicOptions::new().with_now(now).with_utc(true));
        assert_eq!(r.resolve("date(today, \"dd HH:mmZ\")").await.unwrap(), "16 00:00Z");
    }

    #[tokio::test]
    async fn test_fake_call() {
        let email = resolver().resolve("faker.internet.email()").await.unwrap();
        assert!(email.contains('@'));
    }

    #[tokio::test]
    async fn test_seeded_resolvers_agree() {
        let a = resolver().resolve("faker.person.fullName()").await.unwrap();
        let b = resolver().resolve("faker.person.fullName()").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_invalid_path() {
        let err = resolver().resolve("faker.internet.nope()").await.unwrap_err();
        assert!(matches!(err, JsonwrightError::InvalidDynamicPath { .. }));
        assert!(err.to_string().contains("faker.internet.nope"));
        let err = resolver().resolve("faker.internet()").await.unwrap_err();
        assert!(err.to_string().contains("Invalid dynamic function path"));
    }

    #[test]
    fn test_locale_parsing() {
        assert_eq!("en-US".parse::<Locale>().unwrap(), Locale::EnUs);
        assert_eq!("pt_br".parse::<Locale>().unwrap(), Locale::PtBr);
        assert!("fr-FR".parse::<Locale>().is_err());
        assert_eq!(Locale::default().month_name(2, true), "março");
    }
}
