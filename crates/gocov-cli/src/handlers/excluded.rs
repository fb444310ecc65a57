//! Excluded command handler

use super::{apply_profile_args, pipeline_options, report_unresolved};
use crate::commands::ExcludedArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::{format_listing, ProgressReporter};
use gocov::{display_path, untested_locations, write_profiles, ExclusionKind, Pipeline};
use std::path::Path;

/// Heading of the excluded block listing
#[must_use]
pub fn excluded_heading(kind: ExclusionKind) -> String {
    format!("The following lines have instruction '{kind}':")
}

/// Execute the excluded command from working directory `base`
pub fn execute_excluded(base: &Path, config: CliConfig, args: &ExcludedArgs) -> CliResult<()> {
    let kind = ExclusionKind::from(args.kind);
    let mut config = apply_profile_args(config, &args.profiles);
    if let Some(output) = &args.output {
        config = config.with_excluded_output(output);
    }

    let mut reporter =
        ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
    let pipeline = Pipeline::discover(base)?;
    let options = pipeline_options(&config, &args.profiles, false);

    reporter.start_spinner("collecting coverage");
    let outcome = pipeline.run(&options);
    reporter.finish();
    let outcome = outcome?;
    report_unresolved(&reporter, &outcome.applied);

    let excluded = outcome.applied.excluded_of(kind);
    let output = base.join(&config.excluded_output);
    write_profiles(excluded, &output)?;
    reporter.success(&format!("wrote {}", display_path(&output, base)));

    let locations = untested_locations(excluded, pipeline.resolver(), base);
    if locations.is_empty() {
        reporter.info(&format!("no code excluded by '{kind}'"));
    } else if !config.verbosity.is_quiet() {
        print!("{}", format_listing(&excluded_heading(kind), &locations));
    }
    Ok(())
}
