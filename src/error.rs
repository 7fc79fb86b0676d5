//! Error handling for the PidScope-RS library
//!
//! This module defines custom error types and a Result alias for use
//! throughout the crate.

use thiserror::Error;

/// Main error type for PidScope-RS operations
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Errors from the serial transport
    #[error("Serial error: {0}")]
    Serial(#[from] serialport::Error),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// Errors from the line protocol
    #[error("Protocol error: {0}")]
    Protocol(#[from] crate::source::protocol::ProtocolError),

    /// A source operation was invoked in the wrong lifecycle state
    #[error("Source is {state}: {message}")]
    SourceState {
        state: crate::types::SourceState,
        message: String,
    },

    /// Timeout errors
    #[error("Timeout: {0}")]
    Timeout(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TelemetryError>,
    },
}

impl TelemetryError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        TelemetryError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for PidScope-RS operations
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceState;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::Config("missing port name".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing port name");
    }

    #[test]
    fn test_error_with_context() {
        let err = TelemetryError::Channel("disconnected".to_string());
        let with_ctx = err.with_context("Failed to deliver sample");
        assert!(with_ctx.to_string().contains("Failed to deliver sample"));
    }

    #[test]
    fn test_source_state_error() {
        let err = TelemetryError::SourceState {
            state: SourceState::Listening,
            message: "channels already assigned".to_string(),
        };
        assert!(err.to_string().contains("listening"));
        assert!(err.to_string().contains("channels already assigned"));
    }
}
