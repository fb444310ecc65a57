//! Run command handler

use super::{apply_profile_args, pipeline_options, report_unresolved};
use crate::commands::RunArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{format_listing, ProgressReporter};
use gocov::{display_path, untested_locations, write_profiles, Pipeline};
use std::path::Path;

/// Heading of the zero-hit block listing
pub const UNTESTED_HEADING: &str = "The following lines are not tested:";

/// Execute the run command from working directory `base`
pub fn execute_run(base: &Path, config: CliConfig, args: &RunArgs) -> CliResult<()> {
    let enforce = config.enforce || args.enforce;
    let mut config = apply_profile_args(config, &args.profiles).with_enforce(enforce);
    if let Some(output) = &args.output {
        config = config.with_output(output);
    }

    let mut reporter =
        ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
    let pipeline = Pipeline::discover(base)?;
    let options = pipeline_options(&config, &args.profiles, config.enforce);

    let message = if args.profiles.load.is_some() {
        "loading coverage profiles"
    } else {
        "running go test"
    };
    reporter.start_spinner(message);
    let outcome = pipeline.run(&options);
    reporter.finish();
    let outcome = outcome?;
    report_unresolved(&reporter, &outcome.applied);

    let output = base.join(&config.output);
    write_profiles(&outcome.applied.kept, &output)?;
    reporter.success(&format!("wrote {}", display_path(&output, base)));

    if !config.verbosity.is_quiet() {
        let locations = untested_locations(&outcome.applied.kept, pipeline.resolver(), base);
        print!("{}", format_listing(UNTESTED_HEADING, &locations));
    }
    reporter.summary(&outcome.summary);

    match outcome.verdict {
        Some(verdict) if !verdict.ok => {
            reporter.failure(&format!("{} untested range(s)", verdict.ranges.len()));
            Err(CliError::enforcement(verdict.report))
        }
        _ => Ok(()),
    }
}
