//! Jsonwright CLI library
//!
//! Command-line interface over the `jsonwright` runner: `run` executes
//! documents in Chromium, `check` validates them offline, `init` writes a
//! sample project.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod logging;
mod output;
pub mod runner;

pub use commands::{
    CheckArgs, Cli, ColorArg, Commands, InitArgs, LogFormatArg, ReportFormatArg, RunArgs, SpecArgs,
};
pub use config::{CliConfig, ColorChoice, LogFormat, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::init_logging;
pub use output::{render, render_json, render_text, OutputFormat, ProgressReporter};
pub use runner::{execute_run, SuiteRunner};

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}

/// Build configuration from the global flags
#[must_use]
pub fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
        .with_log_format(cli.log_format.into())
}
