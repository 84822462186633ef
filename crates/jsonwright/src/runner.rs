//! Suite orchestration.
//!
//! One browser session per suite, cases strictly in order. A failing case is
//! recorded and the suite moves on; the session stays open until the last
//! case has run.

use crate::driver::{BrowserDriver, DriverFactory};
use crate::dynamic::{DynamicOptions, DynamicResolver};
use crate::executor::{Executor, ExecutorSettings, Memo, DEFAULT_SLOW_TYPE_DELAY_MS};
use crate::expect::ExpectOptions;
use crate::functions::{FunctionBag, FunctionRegistry};
use crate::interpolate::{interpolate_str, VariableBag};
use crate::loader::{CaseEntry, SpecLoader, Suite};
use crate::locator::DEFAULT_TIMEOUT_MS;
use crate::result::{JsonwrightError, JsonwrightResult};
use crate::schema::Action;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Title of the placeholder reported for an empty run
pub const NOOP_TITLE: &str = "No specification documents";

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Base URL for relative and empty case URLs
    pub base_url: Option<String>,
    /// Takes precedence over `base_url`
    pub base_url_override: Option<String>,
    /// Explicit function bag file
    pub functions_path: Option<PathBuf>,
    /// Root for default function bag locations
    pub project_root: PathBuf,
    /// Report a skipped placeholder instead of failing on an empty directory
    pub allow_noop_when_empty: bool,
    /// Delay between characters for `typeSlow`
    pub slow_type_delay: Duration,
    /// Default expectation timeout
    pub expect_timeout: Duration,
    /// Dynamic value settings
    pub dynamic: DynamicOptions,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            base_url_override: None,
            functions_path: None,
            project_root: PathBuf::from("."),
            allow_noop_when_empty: false,
            slow_type_delay: Duration::from_millis(DEFAULT_SLOW_TYPE_DELAY_MS),
            expect_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            dynamic: DynamicOptions::default(),
        }
    }
}

impl RunnerConfig {
    /// Create default config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the base URL override
    #[must_use]
    pub fn with_base_url_override(mut self, url: impl Into<String>) -> Self {
        self.base_url_override = Some(url.into());
        self
    }

    /// Set the function bag file
    #[must_use]
    pub fn with_functions_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.functions_path = Some(path.into());
        self
    }

    /// Set the project root
    #[must_use]
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    /// Tolerate an empty or missing directory
    #[must_use]
    pub const fn with_allow_noop_when_empty(mut self, allow: bool) -> Self {
        self.allow_noop_when_empty = allow;
        self
    }

    /// Set the `typeSlow` delay
    #[must_use]
    pub const fn with_slow_type_delay(mut self, delay: Duration) -> Self {
        self.slow_type_delay = delay;
        self
    }

    /// Set the default expectation timeout
    #[must_use]
    pub const fn with_expect_timeout(mut self, timeout: Duration) -> Self {
        self.expect_timeout = timeout;
        self
    }

    /// Set dynamic value options
    #[must_use]
    pub fn with_dynamic(mut self, dynamic: DynamicOptions) -> Self {
        self.dynamic = dynamic;
        self
    }

    /// Override, else base
    #[must_use]
    pub fn effective_base(&self) -> Option<&str> {
        self.base_url_override
            .as_deref()
            .or(self.base_url.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn executor_settings(&self) -> ExecutorSettings {
        let timeout_ms = u64::try_from(self.expect_timeout.as_millis()).unwrap_or(u64::MAX);
        ExecutorSettings {
            slow_type_delay: self.slow_type_delay,
            expect: ExpectOptions::new().with_timeout(timeout_ms),
            ..ExecutorSettings::default()
        }
    }
}

fn is_absolute_http(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Navigation target of a case.
///
/// `None` when neither the case nor its document names a URL. An empty URL
/// means the effective base; anything not absolute is joined onto it.
pub fn resolve_case_url(
    entry: &CaseEntry,
    bag: &VariableBag,
    base: Option<&str>,
) -> JsonwrightResult<Option<String>> {
    let Some(raw) = entry.case.url.as_deref().or(entry.suite_url.as_deref()) else {
        return Ok(None);
    };
    let url = interpolate_str(raw, bag).trim().to_string();
    if url.is_empty() {
        return base.map(|b| Some(b.to_string())).ok_or_else(|| JsonwrightError::NoBaseUrl {
            title: entry.title.clone(),
        });
    }
    if is_absolute_http(&url) {
        return Ok(Some(url));
    }
    let Some(base) = base else {
        return Err(JsonwrightError::InvalidUrl {
            title: entry.title.clone(),
            url,
            message: "relative url without a baseURL".to_string(),
        });
    };
    let joined = Url::parse(base)
        .and_then(|b| b.join(&url))
        .map_err(|e| JsonwrightError::InvalidUrl {
            title: entry.title.clone(),
            url: url.clone(),
            message: e.to_string(),
        })?;
    Ok(Some(joined.to_string()))
}

/// Whether any string inside `value` carries a `{token}`
fn has_template(value: &Value) -> bool {
    match value {
        Value::String(s) => s.contains('{'),
        Value::Array(items) => items.iter().any(has_template),
        Value::Object(map) => map.values().any(has_template),
        _ => false,
    }
}

/// Structural problems of a loaded suite that can be found without a browser
#[must_use]
pub fn check_suite(suite: &Suite, config: &RunnerConfig) -> Vec<JsonwrightError> {
    let bag = VariableBag::new();
    let base = config.effective_base();
    let mut problems = Vec::new();
    for entry in suite.before.iter().chain(&suite.cases) {
        let templated = entry
            .case
            .url
            .as_deref()
            .or(entry.suite_url.as_deref())
            .is_some_and(|u| u.contains('{'));
        if !templated {
            if let Err(err) = resolve_case_url(entry, &bag, base) {
                problems.push(err);
            }
        }
        for (i, action) in entry.case.actions.iter().enumerate() {
            if has_template(action) {
                continue;
            }
            if let Err(err) = Action::from_value(action.clone()) {
                problems.push(JsonwrightError::InvalidDocument {
                    path: entry.source.clone(),
                    message: format!("{} action #{}: {err}", entry.key, i + 1),
                });
            }
        }
    }
    problems
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Outcome of one case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    /// All actions completed
    Passed,
    /// An action failed
    Failed,
    /// Nothing to run
    Skipped,
}

/// Result of one case
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    /// Case key
    pub key: String,
    /// Case title
    pub title: String,
    /// Outcome
    pub status: CaseStatus,
    /// Wall time
    #[serde(rename = "durationMs", serialize_with = "as_millis")]
    pub duration: Duration,
    /// Failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaseResult {
    /// Passing result
    #[must_use]
    pub fn pass(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            status: CaseStatus::Passed,
            duration: Duration::ZERO,
            error: None,
        }
    }

    /// Failing result
    #[must_use]
    pub fn fail(key: impl Into<String>, title: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            status: CaseStatus::Failed,
            duration: Duration::ZERO,
            error: Some(error.into()),
        }
    }

    /// Skipped result
    #[must_use]
    pub fn skip(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            status: CaseStatus::Skipped,
            duration: Duration::ZERO,
            error: None,
        }
    }

    /// Set duration
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Results of one document
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    /// Suite title
    pub title: String,
    /// Document path
    pub path: PathBuf,
    /// Per-case results
    pub cases: Vec<CaseResult>,
    /// Wall time
    #[serde(rename = "durationMs", serialize_with = "as_millis")]
    pub duration: Duration,
}

impl SuiteReport {
    /// Empty report for a document
    #[must_use]
    pub fn new(title: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            title: title.into(),
            path: path.into(),
            cases: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Suite that could not be set up
    #[must_use]
    pub fn setup_failed(title: impl Into<String>, path: impl Into<PathBuf>, err: &JsonwrightError) -> Self {
        let mut report = Self::new(title, path);
        report
            .cases
            .push(CaseResult::fail("setup", "suite setup", err.to_string()));
        report
    }

    fn count(&self, status: CaseStatus) -> usize {
        self.cases.iter().filter(|c| c.status == status).count()
    }

    /// Passed cases
    #[must_use]
    pub fn passed(&self) -> usize {
        self.count(CaseStatus::Passed)
    }

    /// Failed cases
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(CaseStatus::Failed)
    }

    /// Skipped cases
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(CaseStatus::Skipped)
    }

    /// No failed case
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Results of a whole run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Per-document results
    pub suites: Vec<SuiteReport>,
}

impl RunReport {
    /// Passed cases across suites
    #[must_use]
    pub fn passed(&self) -> usize {
        self.suites.iter().map(SuiteReport::passed).sum()
    }

    /// Failed cases across suites
    #[must_use]
    pub fn failed(&self) -> usize {
        self.suites.iter().map(SuiteReport::failed).sum()
    }

    /// Skipped cases across suites
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.suites.iter().map(SuiteReport::skipped).sum()
    }

    /// Every suite succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.suites.iter().all(SuiteReport::is_success)
    }
}

/// Per-suite collaborators shared by its cases
struct SuiteContext<'a> {
    driver: &'a dyn BrowserDriver,
    functions: Option<&'a dyn FunctionBag>,
    dynamic: &'a DynamicResolver,
    settings: &'a ExecutorSettings,
}

/// Runs specification documents against browser sessions
pub struct Runner {
    config: RunnerConfig,
    factory: Arc<dyn DriverFactory>,
    functions: Option<Arc<dyn FunctionBag>>,
    loader: SpecLoader,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .field("functions", &self.functions.as_ref().map(|b| b.names()))
            .finish_non_exhaustive()
    }
}

impl Runner {
    /// Create a runner
    #[must_use]
    pub fn new(config: RunnerConfig, factory: Arc<dyn DriverFactory>) -> Self {
        Self {
            config,
            factory,
            functions: None,
            loader: SpecLoader::new(),
        }
    }

    /// Use this bag instead of discovering one per suite
    #[must_use]
    pub fn with_functions(mut self, functions: Arc<dyn FunctionBag>) -> Self {
        self.functions = Some(functions);
        self
    }

    /// Settings in use
    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    fn noop_report() -> RunReport {
        let mut suite = SuiteReport::new(NOOP_TITLE, PathBuf::new());
        suite.cases.push(CaseResult::skip("noop", NOOP_TITLE));
        RunReport {
            suites: vec![suite],
        }
    }

    /// Run every document under `dir`
    pub async fn run_dir(&self, dir: &Path) -> JsonwrightResult<RunReport> {
        let files = match SpecLoader::discover(dir) {
            Ok(files) => files,
            Err(JsonwrightError::MissingDirectory { .. }) if self.config.allow_noop_when_empty => {
                info!(dir = %dir.display(), "specification directory missing, nothing to run");
                return Ok(Self::noop_report());
            }
            Err(err) => return Err(err),
        };
        if files.is_empty() {
            if self.config.allow_noop_when_empty {
                info!(dir = %dir.display(), "no specification documents, nothing to run");
                return Ok(Self::noop_report());
            }
            return Err(JsonwrightError::NoSpecFiles {
                path: dir.to_path_buf(),
            });
        }
        Ok(self.run_files(&files).await)
    }

    /// Run the given documents in order
    pub async fn run_files(&self, files: &[PathBuf]) -> RunReport {
        let mut report = RunReport::default();
        for path in files {
            let suite_report = match self.loader.load(path) {
                Ok(suite) => self.run_suite(&suite).await,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to load document");
                    SuiteReport::setup_failed(path.display().to_string(), path, &err)
                }
            };
            report.suites.push(suite_report);
        }
        report
    }

    fn discover_functions(&self) -> JsonwrightResult<Option<Arc<dyn FunctionBag>>> {
        if let Some(bag) = &self.functions {
            return Ok(Some(Arc::clone(bag)));
        }
        let found = FunctionRegistry::discover(
            &self.config.project_root,
            self.config.functions_path.as_deref(),
        )?;
        Ok(found.map(|r| Arc::new(r) as Arc<dyn FunctionBag>))
    }

    /// Run one loaded suite in a fresh session
    pub async fn run_suite(&self, suite: &Suite) -> SuiteReport {
        let start = Instant::now();
        info!(title = %suite.title, path = %suite.path.display(), cases = suite.cases.len(), "suite started");

        if suite.is_empty() {
            info!(title = %suite.title, "document has no cases");
            let mut report = SuiteReport::new(&suite.title, &suite.path);
            report
                .cases
                .push(CaseResult::skip("noop", format!("{}: no cases", suite.title)));
            return report;
        }

        let functions = match self.discover_functions() {
            Ok(f) => f,
            Err(err) => return SuiteReport::setup_failed(&suite.title, &suite.path, &err),
        };
        let driver = match self.factory.open().await {
            Ok(d) => d,
            Err(err) => return SuiteReport::setup_failed(&suite.title, &suite.path, &err),
        };
        let dynamic = DynamicResolver::new(self.config.dynamic.clone());
        let settings = self.config.executor_settings();
        let ctx = SuiteContext {
            driver: driver.as_ref(),
            functions: functions.as_deref(),
            dynamic: &dynamic,
            settings: &settings,
        };

        let mut report = SuiteReport::new(&suite.title, &suite.path);
        for entry in &suite.cases {
            let case_start = Instant::now();
            info!(case = %entry.title, "case started");
            let result = match self.run_case(&ctx, &suite.before, entry).await {
                Ok(()) => {
                    info!(case = %entry.title, "case passed");
                    CaseResult::pass(&entry.key, &entry.title)
                }
                Err(err) => {
                    warn!(case = %entry.title, error = %err, "case failed");
                    CaseResult::fail(&entry.key, &entry.title, err.to_string())
                }
            };
            report.cases.push(result.with_duration(case_start.elapsed()));
        }

        if let Err(err) = driver.close().await {
            warn!(error = %err, "failed to close browser session");
        }
        report.duration = start.elapsed();
        info!(
            title = %suite.title,
            passed = report.passed(),
            failed = report.failed(),
            "suite finished"
        );
        report
    }

    async fn run_case(
        &self,
        ctx: &SuiteContext<'_>,
        before: &[CaseEntry],
        entry: &CaseEntry,
    ) -> JsonwrightResult<()> {
        let mut bag = VariableBag::new();
        for dep in before {
            debug!(case = %entry.title, before = %dep.title, "running before case");
            self.execute_entry(ctx, dep, &mut bag).await?;
        }
        self.execute_entry(ctx, entry, &mut bag).await
    }

    async fn execute_entry(
        &self,
        ctx: &SuiteContext<'_>,
        entry: &CaseEntry,
        bag: &mut VariableBag,
    ) -> JsonwrightResult<()> {
        if let Some(url) = resolve_case_url(entry, bag, self.config.effective_base())? {
            debug!(case = %entry.title, url = %url, "navigating");
            ctx.driver.navigate(&url).await?;
        }
        if entry.case.actions.is_empty() {
            info!(case = %entry.title, "case has no actions");
            return Ok(());
        }

        let executor = Executor::new(ctx.driver, ctx.dynamic, ctx.settings)
            .with_functions(ctx.functions)
            .with_case_context(entry.case.context.as_ref())
            .with_base_dir(&entry.base_dir);
        let mut memo = Memo::default();
        for (i, action) in entry.case.actions.iter().enumerate() {
            debug!(case = %entry.title, action = i + 1, "executing action");
            executor.execute(action, bag, &mut memo, None).await?;
        }
        Ok(())
    }
}
