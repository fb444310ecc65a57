//! Result and error types for gocov.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for gocov operations
pub type GocovResult<T> = Result<T, GocovError>;

/// Errors that can occur while scanning, merging, applying or enforcing.
///
/// An enforcement failure (untested code found) is not an error: it is
/// reported through [`crate::enforce::Verdict`].
#[derive(Debug, Error)]
pub enum GocovError {
    /// A Go source file could not be lexed or parsed
    #[error("Parse error in {path}:{line}:{column}: {message}")]
    Parse {
        /// File being scanned
        path: PathBuf,
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
        /// What went wrong
        message: String,
    },

    /// Two profiles for one source unit have incompatible block shapes
    #[error("Structural mismatch in {unit}: existing block {existing} conflicts with {incoming}")]
    StructuralMismatch {
        /// Source unit name
        unit: String,
        /// Block already in the accumulator
        existing: String,
        /// Block being merged in
        incoming: String,
    },

    /// A profile's counting mode differs from the mode already merged
    #[error("Cannot merge {unit}: mode {existing} differs from {incoming}")]
    ModeMismatch {
        /// Source unit of the incoming profile
        unit: String,
        /// Mode already in the accumulator
        existing: String,
        /// Mode of the incoming profile
        incoming: String,
    },

    /// A source unit named by a profile cannot be mapped back to a file
    #[error("Cannot resolve source unit {unit} to a file")]
    MissingExclusionTarget {
        /// Source unit name
        unit: String,
    },

    /// A coverage profile artifact is malformed
    #[error("Malformed coverage profile at line {line}: {message}")]
    ProfileFormat {
        /// 1-based line in the artifact
        line: usize,
        /// What went wrong
        message: String,
    },

    /// A counting mode other than set/count/atomic
    #[error("Unsupported cover mode: '{0}'")]
    UnsupportedMode(String),

    /// `go test` exited with an error
    #[error("Error executing tests for {package}\nOutput:[\n{output}]")]
    TestExecution {
        /// Import path of the package under test
        package: String,
        /// Combined output of the test run
        output: String,
    },

    /// A scan, test or merge worker thread panicked
    #[error("Worker thread panicked: {worker}")]
    WorkerPanicked {
        /// Which worker
        worker: String,
    },

    /// Bad glob pattern passed to profile loading
    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GocovError {
    /// Create a profile format error
    #[must_use]
    pub fn profile_format(line: usize, message: impl Into<String>) -> Self {
        Self::ProfileFormat {
            line,
            message: message.into(),
        }
    }

    /// Create a missing exclusion target error
    #[must_use]
    pub fn missing_target(unit: impl Into<String>) -> Self {
        Self::MissingExclusionTarget { unit: unit.into() }
    }

    /// True for errors that only concern one file and must not abort the others
    #[must_use]
    pub const fn is_per_file(&self) -> bool {
        matches!(self, Self::MissingExclusionTarget { .. })
    }
}
