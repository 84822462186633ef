//! Check command handler: validate documents without opening a browser

use crate::commands::CheckArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use crate::runner::base_config;
use jsonwright::{check_suite, JsonwrightError, RunnerConfig, SpecLoader};
use std::path::{Path, PathBuf};

/// Problems found in one document
#[derive(Debug)]
pub struct DocumentCheck {
    /// Document path
    pub path: PathBuf,
    /// Case count, when the document loaded
    pub cases: usize,
    /// Load and structure errors
    pub problems: Vec<JsonwrightError>,
}

impl DocumentCheck {
    /// Whether the document is usable
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Validate one document
#[must_use]
pub fn check_document(loader: &SpecLoader, path: &Path, config: &RunnerConfig) -> DocumentCheck {
    match loader.load(path) {
        Ok(suite) => DocumentCheck {
            path: path.to_path_buf(),
            cases: suite.cases.len(),
            problems: check_suite(&suite, config),
        },
        Err(err) => DocumentCheck {
            path: path.to_path_buf(),
            cases: 0,
            problems: vec![err],
        },
    }
}

/// Documents selected by `--file`, else discovered under the directory
pub fn select_documents(files: &[PathBuf], dir: &Path, allow_noop: bool) -> CliResult<Vec<PathBuf>> {
    if !files.is_empty() {
        return Ok(files.to_vec());
    }
    match SpecLoader::discover(dir) {
        Ok(found) if found.is_empty() && !allow_noop => Err(JsonwrightError::NoSpecFiles {
            path: dir.to_path_buf(),
        }
        .into()),
        Ok(found) => Ok(found),
        Err(JsonwrightError::MissingDirectory { .. }) if allow_noop => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}

/// Execute the check command
pub fn execute_check(config: &CliConfig, args: &CheckArgs) -> CliResult<()> {
    let spec = &args.spec;
    let runner_config = base_config(spec);
    let reporter = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());

    let files = select_documents(&spec.files, &spec.dir, spec.allow_noop)?;
    if files.is_empty() {
        reporter.info(&format!("no documents in {}", spec.dir.display()));
        return Ok(());
    }

    let loader = SpecLoader::new();
    let mut count = 0;
    for path in &files {
        let checked = check_document(&loader, path, &runner_config);
        if checked.is_ok() {
            reporter.success(&format!("{} ({} cases)", path.display(), checked.cases));
        } else {
            for problem in &checked.problems {
                reporter.failure(&format!("{}: {problem}", path.display()));
            }
        }
        count += checked.problems.len();
    }

    if count == 0 {
        Ok(())
    } else {
        Err(CliError::CheckFailed { count })
    }
}
