//! Error types for invc-core.

use thiserror::Error;

/// Result type alias using invc-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for investigation operations
#[derive(Error, Debug)]
pub enum Error {
    // Submission errors
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("No tool configured for: {0}")]
    UnknownTool(String),

    // Process errors
    #[error("Failed to launch {program}: {message}")]
    LaunchFailed { program: String, message: String },

    // Task errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a process that could not be started
    pub fn launch_failed(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LaunchFailed {
            program: program.into(),
            message: message.into(),
        }
    }
}
