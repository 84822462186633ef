//! Output formatting and progress reporting

use crate::error::CliResult;
use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use jsonwright::{CaseResult, CaseStatus, RunReport};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;

/// Output format for run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Progress reporter for suite execution, writes to stderr
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
    /// Verbose mode, lists passing cases too
    pub verbose: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
            verbose: false,
        }
    }

    /// List passing cases as well as failures and skips
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Whether a case with `status` gets its own line
    #[must_use]
    pub const fn shows_case(&self, status: CaseStatus) -> bool {
        match status {
            CaseStatus::Passed => self.verbose && !self.quiet,
            CaseStatus::Skipped => !self.quiet,
            CaseStatus::Failed => true,
        }
    }

    /// Start a progress bar over `total` documents
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Increment progress
    pub fn increment(&self, delta: u64) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(delta);
        }
    }

    /// Update progress message
    pub fn set_message(&self, message: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(message.to_string());
        }
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    fn line(&self, message: &str) {
        match self.progress_bar {
            Some(ref pb) => pb.println(message),
            None => {
                let _ = self.term.write_line(message);
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // failures print in quiet mode too
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Report one finished case
    pub fn case(&self, result: &CaseResult) {
        if !self.shows_case(result.status) {
            return;
        }
        let label = format!("{} ({}ms)", result.title, result.duration.as_millis());
        match result.status {
            CaseStatus::Passed => self.success(&label),
            CaseStatus::Skipped => self.warning(&format!("{label} skipped")),
            CaseStatus::Failed => {
                let error = result.error.as_deref().unwrap_or("failed");
                self.failure(&format!("{label}: {error}"));
            }
        }
    }

    /// Print run summary
    pub fn summary(&self, passed: usize, failed: usize, skipped: usize, duration: Duration) {
        if self.quiet && failed == 0 {
            return;
        }
        let _ = self.term.write_line("");
        let _ = self
            .term
            .write_line(&summary_line(passed, failed, skipped, duration, self.use_color));
    }
}

fn summary_line(
    passed: usize,
    failed: usize,
    skipped: usize,
    duration: Duration,
    use_color: bool,
) -> String {
    let total = passed + failed + skipped;
    let secs = duration.as_secs_f64();
    if use_color {
        let passed_style = Style::new().green().bold();
        let failed_style = Style::new().red().bold();
        let status = if failed > 0 {
            failed_style.apply_to("FAILED")
        } else {
            passed_style.apply_to("PASSED")
        };
        format!(
            "{status} {total} cases in {secs:.2}s ({} passed, {} failed, {} skipped)",
            passed_style.apply_to(passed),
            if failed > 0 {
                failed_style.apply_to(failed).to_string()
            } else {
                failed.to_string()
            },
            Style::new().yellow().apply_to(skipped)
        )
    } else {
        let status = if failed > 0 { "FAILED" } else { "PASSED" };
        format!(
            "{status} {total} cases in {secs:.2}s ({passed} passed, {failed} failed, {skipped} skipped)"
        )
    }
}

/// Render a run report as plain text
#[must_use]
pub fn render_text(report: &RunReport) -> String {
    let mut out = String::new();
    let mut duration = Duration::ZERO;
    for suite in &report.suites {
        duration += suite.duration;
        let _ = writeln!(out, "{} [{}]", suite.title, suite.path.display());
        for case in &suite.cases {
            let mark = match case.status {
                CaseStatus::Passed => "ok",
                CaseStatus::Failed => "FAILED",
                CaseStatus::Skipped => "skipped",
            };
            let _ = write!(out, "  {} ... {mark}", case.title);
            if let Some(error) = &case.error {
                let _ = write!(out, "\n      {error}");
            }
            out.push('\n');
        }
    }
    out.push_str(&summary_line(
        report.passed(),
        report.failed(),
        report.skipped(),
        duration,
        false,
    ));
    out.push('\n');
    out
}

/// Render a run report as pretty JSON
pub fn render_json(report: &RunReport) -> CliResult<String> {
    let value = serde_json::json!({
        "success": report.is_success(),
        "passed": report.passed(),
        "failed": report.failed(),
        "skipped": report.skipped(),
        "suites": report.suites,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Render in the requested format
pub fn render(report: &RunReport, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Json => render_json(report),
    }
}
