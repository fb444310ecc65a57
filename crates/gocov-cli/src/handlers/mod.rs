//! Command handlers
//!
//! Each handler module contains the execution logic for one CLI command
//! plus the pure helpers it renders output with.

pub mod excluded;
pub mod run;
pub mod scan;

pub use excluded::{excluded_heading, execute_excluded};
pub use run::{execute_run, UNTESTED_HEADING};
pub use scan::{execute_scan, render_json, render_text};

use crate::commands::ProfileArgs;
use crate::config::CliConfig;
use crate::output::ProgressReporter;
use gocov::{Applied, PipelineOptions, ProfileSource};

/// Fold profile flags over the loaded configuration
#[must_use]
pub fn apply_profile_args(config: CliConfig, args: &ProfileArgs) -> CliConfig {
    let mut config = config.with_test_args(args.test_args.iter().cloned());
    if args.short {
        config = config.with_short(true);
    }
    if let Some(timeout) = &args.timeout {
        config = config.with_timeout(timeout.clone());
    }
    if let Some(jobs) = args.jobs {
        config = config.with_parallel_jobs(jobs);
    }
    config
}

/// Pipeline options for one invocation
#[must_use]
pub fn pipeline_options(config: &CliConfig, args: &ProfileArgs, enforce: bool) -> PipelineOptions {
    let source = match &args.load {
        Some(pattern) => ProfileSource::Load(pattern.clone()),
        None => ProfileSource::Run(config.test_options()),
    };
    PipelineOptions {
        packages: args.packages.clone(),
        source,
        enforce,
        jobs: config.effective_jobs(),
    }
}

/// Warn about units the applier could not map to a file
pub fn report_unresolved(reporter: &ProgressReporter, applied: &Applied) {
    for err in &applied.unresolved {
        reporter.warning(&err.to_string());
    }
}
