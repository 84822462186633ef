//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Jsonwright: run browser tests described as JSON documents
#[derive(Parser, Debug)]
#[command(name = "jsonwright")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormatArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run specification documents in a browser
    Run(RunArgs),

    /// Validate specification documents without a browser
    Check(CheckArgs),

    /// Scaffold example documents and a function bag
    Init(InitArgs),
}

/// Options shared by `run` and `check`
#[derive(clap::Args, Debug, Clone)]
pub struct SpecArgs {
    /// Directory of specification documents
    #[arg(default_value = "fixtures")]
    pub dir: PathBuf,

    /// Run only these documents instead of discovering `dir`
    #[arg(short, long = "file")]
    pub files: Vec<PathBuf>,

    /// Base URL for empty and relative case URLs
    #[arg(long, env = "JSONWRIGHT_BASE_URL")]
    pub base_url: Option<String>,

    /// Takes precedence over --base-url
    #[arg(long, env = "JSONWRIGHT_BASE_URL_OVERRIDE")]
    pub base_url_override: Option<String>,

    /// Report a skipped placeholder when no documents are found
    #[arg(long, env = "JSONWRIGHT_ALLOW_NOOP")]
    pub allow_noop: bool,

    /// Output format for the report
    #[arg(long, default_value = "text")]
    pub format: ReportFormatArg,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Document selection and URLs
    #[command(flatten)]
    pub spec: SpecArgs,

    /// Function bag file (YAML or JSON)
    #[arg(long, env = "JSONWRIGHT_FUNCTIONS")]
    pub functions: Option<PathBuf>,

    /// Root for default function bag locations
    #[arg(long, default_value = ".")]
    pub project_root: PathBuf,

    /// Month-name locale for date(...) values (pt-BR, en-US)
    #[arg(long, env = "JSONWRIGHT_LOCALE", default_value = "pt-BR")]
    pub locale: String,

    /// Render dates in UTC
    #[arg(long)]
    pub utc: bool,

    /// Seed for reproducible faker and random date values
    #[arg(long, env = "JSONWRIGHT_SEED")]
    pub seed: Option<u64>,

    /// Chromium executable
    #[arg(long, env = "CHROME_PATH")]
    pub chrome: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Launch Chromium without its sandbox (containers)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Default expectation timeout in milliseconds
    #[arg(long, default_value = "5000")]
    pub expect_timeout: u64,

    /// Delay between characters for typeSlow, in milliseconds
    #[arg(long, default_value = "300")]
    pub slow_type_delay: u64,
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Document selection and URLs
    #[command(flatten)]
    pub spec: SpecArgs,
}

/// Arguments for the init command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Project directory
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Auto-detect
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Log line format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Report format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportFormatArg {
    /// Human-readable text
    #[default]
    Text,
    /// JSON document
    Json,
}
