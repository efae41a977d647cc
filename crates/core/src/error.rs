//! Error types for the knowledge-base splitter.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! structural scan failures, per-object parse failures and sink failures.

use thiserror::Error;

/// Unified error type for the splitter.
///
/// All fallible functions return `Result<T, AppError>`.
/// Malformed input is represented as an error, never a panic.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input ended with unmatched nesting or contained a stray closing brace
    #[error("Structural error: {0}")]
    Structural(String),

    /// A captured top-level object was not valid JSON
    #[error("Parse error: {0}")]
    Parse(String),

    /// One or more category sinks failed to write
    #[error("Sink error: {0}")]
    Sink(String),

    /// Invalid category rule table
    #[error("Rule table error: {0}")]
    Rules(String),

    /// The run was interrupted before the input was exhausted
    #[error("Run cancelled before end of input")]
    Cancelled,

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts() {
        let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, AppError::Io(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_json_error_maps_to_serialization() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let app: AppError = err.into();
        assert!(matches!(app, AppError::Serialization(_)));
    }
}
