//! Log subscriber setup

use crate::config::{CliConfig, LogFormat};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber; `RUST_LOG` wins over the verbosity flags.
///
/// Logs go to stderr so reports on stdout stay machine-readable.
pub fn init_logging(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.log_filter()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    // a second init (tests) keeps the first subscriber
    let _ = match config.log_format {
        LogFormat::Text => builder.with_ansi(config.color.should_color()).try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
