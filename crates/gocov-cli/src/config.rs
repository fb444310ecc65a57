//! CLI configuration

use crate::error::{CliError, CliResult};
use gocov::{TestOptions, COVERAGE_FILE, UNCOVERAGE_FILE};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Project configuration file, looked up in the working directory
pub const CONFIG_FILE: &str = ".gocov.yaml";

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - errors only
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - stage logging
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// Verbosity from the `-q` flag and `-v` count
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if debug mode
    #[must_use]
    pub const fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => console::Term::stdout().features().colors_supported(),
        }
    }
}

fn parse_yaml(text: &str) -> Result<CliConfig, serde_yaml_ng::Error> {
    if text.trim().is_empty() {
        return Ok(CliConfig::default());
    }
    serde_yaml_ng::from_str(text)
}

/// CLI configuration
///
/// Missing keys in [`CONFIG_FILE`] fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Verbosity level
    #[serde(skip)]
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// Number of parallel jobs (0 = auto-detect)
    pub parallel_jobs: usize,
    /// Kept coverage artifact
    pub output: PathBuf,
    /// Excluded coverage artifact
    pub excluded_output: PathBuf,
    /// Fail on untested code
    pub enforce: bool,
    /// Pass `-short` to `go test`
    pub short: bool,
    /// `go test -timeout` value
    pub timeout: Option<String>,
    /// Extra `go test` arguments
    pub test_args: Vec<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Auto,
            parallel_jobs: 0, // Auto-detect
            output: PathBuf::from(COVERAGE_FILE),
            excluded_output: PathBuf::from(UNCOVERAGE_FILE),
            enforce: false,
            short: false,
            timeout: None,
            test_args: Vec::new(),
        }
    }
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML configuration document
    pub fn from_yaml(text: &str) -> CliResult<Self> {
        parse_yaml(text).map_err(|e| CliError::config(e.to_string()))
    }

    /// Load [`CONFIG_FILE`] from `dir`, defaults when absent
    pub fn load(dir: &Path) -> CliResult<Self> {
        let path = dir.join(CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(text) => parse_yaml(&text)
                .map_err(|e| CliError::config(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set parallel jobs
    #[must_use]
    pub const fn with_parallel_jobs(mut self, jobs: usize) -> Self {
        self.parallel_jobs = jobs;
        self
    }

    /// Set the kept coverage artifact
    #[must_use]
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    /// Set the excluded coverage artifact
    #[must_use]
    pub fn with_excluded_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.excluded_output = output.into();
        self
    }

    /// Set enforcement
    #[must_use]
    pub const fn with_enforce(mut self, enforce: bool) -> Self {
        self.enforce = enforce;
        self
    }

    /// Set short mode
    #[must_use]
    pub const fn with_short(mut self, short: bool) -> Self {
        self.short = short;
        self
    }

    /// Set test timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    /// Append extra test arguments
    #[must_use]
    pub fn with_test_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.test_args.extend(args);
        self
    }

    /// Get effective number of parallel jobs
    #[must_use]
    pub fn effective_jobs(&self) -> usize {
        if self.parallel_jobs == 0 {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        } else {
            self.parallel_jobs
        }
    }

    /// Options for the `go test` runner
    #[must_use]
    pub fn test_options(&self) -> TestOptions {
        TestOptions {
            short: self.short,
            timeout: self.timeout.clone(),
            verbose: self.verbosity.is_debug(),
            test_args: self.test_args.clone(),
            jobs: self.effective_jobs(),
        }
    }
}
