//! CLI command definitions using clap

use crate::config::ColorChoice;
use clap::{Args, Parser, Subcommand, ValueEnum};
use gocov::ExclusionKind;
use std::path::PathBuf;

/// gocov: run Go tests, merge coverage, and fail on untested code not annotated
/// with `// notest` or `// notestdept`
#[derive(Parser, Debug)]
#[command(name = "gocov")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, global = true)]
    pub color: Option<ColorArg>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run tests, merge coverage and report untested code
    Run(RunArgs),

    /// Write and list the code excluded by one annotation kind
    Excluded(ExcludedArgs),

    /// Print the annotated lines of Go files
    Scan(ScanArgs),
}

/// Where profiles come from and which packages they cover
#[derive(Args, Debug, Clone, Default)]
pub struct ProfileArgs {
    /// Packages (`./...` when empty)
    pub packages: Vec<String>,

    /// Pass -short to go test
    #[arg(long)]
    pub short: bool,

    /// go test timeout (e.g. 10m)
    #[arg(long)]
    pub timeout: Option<String>,

    /// Load existing coverage artifacts matching a glob instead of running tests
    #[arg(short, long, value_name = "GLOB")]
    pub load: Option<String>,

    /// Extra argument for go test (repeatable)
    #[arg(short = 't', long = "test-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub test_args: Vec<String>,

    /// Number of parallel jobs (0 = available parallelism)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

/// Arguments for the run command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Profile selection
    #[command(flatten)]
    pub profiles: ProfileArgs,

    /// Fail when untested code remains
    #[arg(short, long)]
    pub enforce: bool,

    /// Coverage artifact to write
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the excluded command
#[derive(Args, Debug, Clone)]
pub struct ExcludedArgs {
    /// Annotation kind
    #[arg(value_enum)]
    pub kind: MarkerArg,

    /// Profile selection
    #[command(flatten)]
    pub profiles: ProfileArgs,

    /// Excluded coverage artifact to write
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the scan command
#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Go source files
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: ScanFormat,
}

/// Annotation kind argument
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerArg {
    /// `// notest`
    Notest,
    /// `// notestdept`
    Notestdept,
}

impl From<MarkerArg> for ExclusionKind {
    fn from(arg: MarkerArg) -> Self {
        match arg {
            MarkerArg::Notest => Self::Manual,
            MarkerArg::Notestdept => Self::Dependent,
        }
    }
}

/// Scan output format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanFormat {
    /// `path:line kind` lines
    #[default]
    Text,
    /// JSON object keyed by path
    Json,
}

/// Color argument
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorArg {
    /// Auto-detect
    #[default]
    Auto,
    /// Always
    Always,
    /// Never
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
