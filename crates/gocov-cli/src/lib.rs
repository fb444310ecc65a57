//! gocov CLI library
//!
//! Command definitions, configuration, logging bootstrap and the handlers
//! behind the `gocov` binary.

#![warn(missing_docs)]

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
mod output;

pub use commands::{
    Cli, ColorArg, Commands, ExcludedArgs, MarkerArg, ProfileArgs, RunArgs, ScanArgs, ScanFormat,
};
pub use config::{CliConfig, ColorChoice, Verbosity, CONFIG_FILE};
pub use error::{CliError, CliResult};
pub use output::{format_listing, ProgressReporter};
