//! Core error types for pranaroom-core.
//!
//! This module defines the error hierarchy for the practice engine using
//! thiserror. Configuration and clock errors are fatal to the operation that
//! raised them; camera errors are carried as data and never abort a session.

use std::path::PathBuf;
use thiserror::Error;

use crate::events::Event;
use crate::session::{SessionReport, SessionStatus};

/// Core error type for pranaroom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration or catalog errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session lifecycle errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors, including malformed technique definitions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Every phase of the breath cycle has zero duration
    #[error("Technique '{technique}' has no phase with a positive duration")]
    EmptyCycle { technique: String },

    /// A phase duration is negative or not a finite number
    #[error("Technique '{technique}' has an invalid {phase} duration: {value}")]
    InvalidPhaseDuration {
        technique: String,
        phase: String,
        value: f64,
    },

    /// A pose or meditation sequence has no items
    #[error("Technique '{technique}' has an empty item sequence")]
    EmptySequence { technique: String },

    /// A sequence item would be held for zero time
    #[error("Technique '{technique}' item '{item}' has a zero hold duration")]
    ZeroHold { technique: String, item: String },

    /// Two catalog entries share an id
    #[error("Duplicate technique id in catalog: {0}")]
    DuplicateTechnique(String),

    /// A referenced catalog item does not exist
    #[error("Unknown catalog item: {0}")]
    UnknownItem(String),
}

/// Errors raised while scheduling the session clock.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClockError {
    /// Interval outside the schedulable range
    #[error("Tick interval of {interval_ms}ms is outside {min_ms}..={max_ms}ms")]
    InvalidInterval {
        interval_ms: u64,
        min_ms: u64,
        max_ms: u64,
    },

    /// Resume requested on a clock that was never started or already stopped
    #[error("Clock is not scheduled")]
    NotScheduled,

    /// The host's timer resource failed
    #[error("Timer scheduling failed: {0}")]
    SchedulingFailed(String),
}

/// Camera acquisition outcomes other than success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// The user refused access
    #[error("Camera access denied")]
    Denied,

    /// No device is present or it is in use elsewhere
    #[error("Camera unavailable: {0}")]
    Unavailable(String),

    /// The acquisition call itself failed
    #[error("Camera acquisition failed: {0}")]
    Failed(String),
}

/// Session lifecycle errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Technique id not present in the catalog
    #[error("Unknown technique: {0}")]
    UnknownTechnique(String),

    /// The technique cannot be run
    #[error("Invalid technique: {0}")]
    InvalidTechnique(#[from] ConfigError),

    /// The clock could not be scheduled at start
    #[error("Clock could not be started: {0}")]
    ClockUnavailable(#[source] ClockError),

    /// The command is not valid in the current state
    #[error("Cannot {command} while session is {status:?}")]
    InvalidTransition {
        command: &'static str,
        status: SessionStatus,
    },

    /// The clock failed mid-session; the session was aborted
    #[error("Session aborted after clock failure: {source}")]
    ClockFailed {
        #[source]
        source: ClockError,
        /// Partial report, present when any samples were collected
        report: Option<Box<SessionReport>>,
        /// `ClockFailed` followed by the events of aborting the session
        events: Vec<Event>,
    },

    /// The command channel closed before the session ended
    #[error("Command channel closed")]
    ChannelClosed,
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_into_core_error() {
        let err: CoreError = ConfigError::EmptyCycle {
            technique: "broken".into(),
        }
        .into();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn invalid_transition_message_names_command() {
        let err = SessionError::InvalidTransition {
            command: "resume",
            status: SessionStatus::Idle,
        };
        assert_eq!(err.to_string(), "Cannot resume while session is Idle");
    }
}
