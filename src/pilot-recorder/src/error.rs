//! Error types for the recorder.

use pilot_core::{DriverError, LaunchError, SelectorError};
use thiserror::Error;

/// Errors that can occur while recording, replaying or saving a session.
#[derive(Error, Debug)]
pub enum RecorderError {
    /// The computed selector resolves to a different widget than the target
    #[error("Selector {selector:?} does not single out {expected}, it matched {matched}")]
    SelectorAmbiguous {
        selector: String,
        expected: String,
        matched: String,
    },

    /// The computed selector matches nothing in the live tree
    #[error("Selector {selector:?} computed for {target} matches no widget")]
    SelectorNotFound { selector: String, target: String },

    /// A widget kind or id that cannot be written as a selector
    #[error("Invalid selector: {0}")]
    InvalidSelector(#[from] SelectorError),

    /// The automation driver failed during replay
    #[error("Replay failed: {0}")]
    Driver(#[from] DriverError),

    /// A new application instance could not be created
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// An operation was requested in the wrong session state
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    /// The live instance did not stop in time
    #[error("Application did not stop within {0} ms")]
    ExitTimeout(u64),

    /// IO error during file operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl RecorderError {
    /// Returns true if the session may continue after this error.
    ///
    /// Only a single unrecordable event is recoverable; everything else
    /// means the recording can no longer be trusted.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RecorderError::InvalidSelector(_))
    }
}

impl From<serde_json::Error> for RecorderError {
    fn from(e: serde_json::Error) -> Self {
        RecorderError::SerializationError(e.to_string())
    }
}

/// Result type for recorder operations.
pub type RecorderResult<T> = Result<T, RecorderError>;
