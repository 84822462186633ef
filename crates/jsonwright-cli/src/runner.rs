//! Run command: maps arguments onto the library runner

use crate::commands::{ReportFormatArg, RunArgs, SpecArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{render, OutputFormat, ProgressReporter};
use jsonwright::{
    DriverFactory, DynamicOptions, Locale, RunReport, Runner, RunnerConfig, SpecLoader,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

impl From<ReportFormatArg> for OutputFormat {
    fn from(arg: ReportFormatArg) -> Self {
        match arg {
            ReportFormatArg::Text => Self::Text,
            ReportFormatArg::Json => Self::Json,
        }
    }
}

/// Base URL, override and noop settings shared with `check`
#[must_use]
pub fn base_config(spec: &SpecArgs) -> RunnerConfig {
    let mut config = RunnerConfig::new().with_allow_noop_when_empty(spec.allow_noop);
    if let Some(url) = &spec.base_url {
        config = config.with_base_url(url.clone());
    }
    if let Some(url) = &spec.base_url_override {
        config = config.with_base_url_override(url.clone());
    }
    config
}

/// Build the library configuration for `run`
pub fn runner_config(args: &RunArgs) -> CliResult<RunnerConfig> {
    let locale: Locale = args
        .locale
        .parse()
        .map_err(|e: jsonwright::JsonwrightError| CliError::invalid_argument(e.to_string()))?;
    let mut dynamic = DynamicOptions::new().with_locale(locale).with_utc(args.utc);
    if let Some(seed) = args.seed {
        dynamic = dynamic.with_seed(seed);
    }

    let mut config = base_config(&args.spec)
        .with_project_root(args.project_root.clone())
        .with_slow_type_delay(Duration::from_millis(args.slow_type_delay))
        .with_expect_timeout(Duration::from_millis(args.expect_timeout))
        .with_dynamic(dynamic);
    if let Some(path) = &args.functions {
        config = config.with_functions_path(path.clone());
    }
    Ok(config)
}

/// Chromium session factory from the browser flags
#[cfg(feature = "browser")]
pub fn driver_factory(args: &RunArgs) -> CliResult<Arc<dyn DriverFactory>> {
    use jsonwright::{BrowserConfig, ChromiumFactory};

    let mut browser = BrowserConfig::new().with_headless(!args.headed);
    if let Some(path) = &args.chrome {
        browser = browser.with_chromium_path(path.display().to_string());
    }
    if args.no_sandbox {
        browser = browser.with_no_sandbox();
    }
    Ok(Arc::new(ChromiumFactory::new(browser)))
}

/// Chromium session factory from the browser flags
#[cfg(not(feature = "browser"))]
pub fn driver_factory(_args: &RunArgs) -> CliResult<Arc<dyn DriverFactory>> {
    Err(CliError::config(
        "jsonwright was built without the `browser` feature",
    ))
}

/// Drives a run, one document at a time, with progress output
#[derive(Debug)]
pub struct SuiteRunner {
    config: CliConfig,
    runner: Runner,
}

impl SuiteRunner {
    /// Create a runner over the given session factory
    #[must_use]
    pub fn new(config: CliConfig, runner_config: RunnerConfig, factory: Arc<dyn DriverFactory>) -> Self {
        Self {
            config,
            runner: Runner::new(runner_config, factory),
        }
    }

    /// Run `--file` documents, or everything under the directory
    pub async fn run(&self, spec: &SpecArgs) -> CliResult<RunReport> {
        let files: Vec<PathBuf> = if spec.files.is_empty() {
            match SpecLoader::discover(&spec.dir) {
                Ok(found) if !found.is_empty() => found,
                // missing or empty directory: noop handling lives in the library
                _ => return Ok(self.runner.run_dir(&spec.dir).await?),
            }
        } else {
            spec.files.clone()
        };

        let mut reporter = ProgressReporter::new(
            self.config.color.should_color(),
            self.config.verbosity.is_quiet(),
        )
        .with_verbose(self.config.verbosity.is_verbose());
        reporter.start_progress(files.len() as u64, "Running");

        let mut report = RunReport::default();
        for path in &files {
            reporter.set_message(&path.display().to_string());
            let part = self.runner.run_files(std::slice::from_ref(path)).await;
            for suite in &part.suites {
                for case in &suite.cases {
                    reporter.case(case);
                }
            }
            report.suites.extend(part.suites);
            reporter.increment(1);
        }
        reporter.finish();

        let duration = report.suites.iter().map(|s| s.duration).sum();
        reporter.summary(report.passed(), report.failed(), report.skipped(), duration);
        Ok(report)
    }
}

fn total_cases(report: &RunReport) -> usize {
    report.suites.iter().map(|s| s.cases.len()).sum()
}

/// Print the report and turn failures into an error
pub fn finish_run(report: &RunReport, format: OutputFormat) -> CliResult<()> {
    println!("{}", render(report, format)?.trim_end());
    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::TestFailures {
            failed: report.failed(),
            total: total_cases(report),
        })
    }
}

/// Execute the run command
pub fn execute_run(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let runner_config = runner_config(args)?;
    let factory = driver_factory(args)?;
    let rt = tokio::runtime::Runtime::new()?;
    let suite_runner = SuiteRunner::new(config.clone(), runner_config, factory);
    let report = rt.block_on(suite_runner.run(&args.spec))?;
    finish_run(&report, args.spec.format.into())
}
