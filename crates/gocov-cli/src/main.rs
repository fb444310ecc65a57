//! gocov: enforceable Go test coverage
//!
//! ## Usage
//!
//! ```bash
//! gocov run -e                       # Test ./..., fail on untested code
//! gocov run --load 'cover/*.out'     # Merge existing artifacts
//! gocov excluded notest              # List code hidden by // notest
//! gocov scan pkg/file.go             # Show annotated lines
//! ```

use clap::Parser;
use gocov_cli::{
    handlers::{execute_excluded, execute_run, execute_scan},
    logging, Cli, CliConfig, CliResult, Commands, Verbosity,
};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e.to_string().trim_end());
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    logging::init(cli.quiet, cli.verbose);

    let base = std::env::current_dir()?;
    let config = build_config(&cli, &base)?;

    match cli.command {
        Commands::Run(args) => execute_run(&base, config, &args),
        Commands::Excluded(args) => execute_excluded(&base, config, &args),
        Commands::Scan(args) => execute_scan(&base, &config, &args),
    }
}

fn build_config(cli: &Cli, base: &Path) -> CliResult<CliConfig> {
    let mut config =
        CliConfig::load(base)?.with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose));
    if let Some(color) = cli.color {
        config = config.with_color(color.into());
    }
    tracing::debug!(?config, "configuration");
    Ok(config)
}
