//! Error types for dds-eval operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dds-eval operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while comparing encoders or preparing inputs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The input path is missing or is not a directory.
    #[error("Input directory {} is not valid", .0.display())]
    InvalidInput(PathBuf),

    /// The output path exists but is not a directory.
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// A required executable could not be found on the search path.
    #[error("To use {tool}, {executable} must be present in the PATH")]
    MissingExecutable {
        /// Tool that needs the executable.
        tool: String,
        /// Executable name that was looked up.
        executable: String,
    },

    /// A child process could not be started.
    #[error("Failed to run {}: {source}", program.display())]
    Spawn {
        /// Program that failed to start.
        program: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// An external tool printed something other than the expected layout.
    #[error("Unexpected {tool} output: {reason}")]
    ToolOutput {
        /// Tool whose output could not be parsed.
        tool: String,
        /// What was expected.
        reason: String,
    },

    /// A tool exited without leaving the file it was expected to produce.
    #[error("Expected output {} was not produced", .0.display())]
    MissingOutput(PathBuf),

    /// A tool exited unsuccessfully while exit codes were being enforced.
    #[error("{tool} failed on {}: exit code {}", input.display(), code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    ToolFailed {
        /// Tool that failed.
        tool: String,
        /// Input the tool was processing.
        input: PathBuf,
        /// Exit code, if the process exited normally.
        code: Option<i32>,
    },

    /// The release API returned something unusable.
    #[error("Release error: {0}")]
    Release(String),

    /// HTTP request failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Archive extraction failure.
    #[error("Archive error: {0}")]
    Archive(String),

    /// The current system has no matching release asset.
    #[error("Unsupported system {os} {arch}: {hint}")]
    UnsupportedPlatform {
        /// Operating system name.
        os: String,
        /// CPU architecture.
        arch: String,
        /// What the user should do instead.
        hint: String,
    },

    /// I/O error wrapper.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn tool_output(tool: &str, reason: impl Into<String>) -> Self {
        Self::ToolOutput {
            tool: tool.to_string(),
            reason: reason.into(),
        }
    }
}
