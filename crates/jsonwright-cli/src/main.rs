//! Jsonwright CLI: run JSON-described browser tests
//!
//! ## Usage
//!
//! ```bash
//! jsonwright init                                   # Scaffold a sample project
//! jsonwright check fixtures --base-url http://localhost:3000
//! jsonwright run fixtures --base-url http://localhost:3000
//! jsonwright run --file fixtures/login.json --format json
//! ```

use clap::Parser;
use jsonwright_cli::{
    build_config, execute_run,
    handlers::{execute_check, execute_init},
    init_logging, Cli, CliResult, Commands,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_logging(&config);

    match cli.command {
        Commands::Run(args) => execute_run(&config, &args),
        Commands::Check(args) => execute_check(&config, &args),
        Commands::Init(args) => execute_init(&config, &args),
    }
}
