//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Output could not be rendered
    #[error("Output failed: {message}")]
    Output {
        /// Error message
        message: String,
    },

    /// Coverage library error
    #[error("{0}")]
    Gocov(#[from] gocov::GocovError),

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Enforcement found untested code
    #[error("untested code:\n{report}")]
    Enforcement {
        /// Enforcer report
        report: String,
    },
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an output error
    #[must_use]
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Create an enforcement failure
    #[must_use]
    pub fn enforcement(report: impl Into<String>) -> Self {
        Self::Enforcement {
            report: report.into(),
        }
    }
}
