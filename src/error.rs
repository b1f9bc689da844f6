//! Error types for sharemeter

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MeterError>;

#[derive(Error, Debug)]
pub enum MeterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API discovery failed: {0}")]
    Discovery(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Malformed appliance response: {0}")]
    Protocol(String),

    #[error("Could not start size calculation: {0}")]
    TaskStart(String),

    #[error("Size calculation failed on the appliance (code {code})")]
    TaskFailed { code: i64 },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl MeterError {
    /// Whether a full restart of the measurement run may clear this error.
    ///
    /// Only a mid-poll application-level failure qualifies; everything else
    /// ends the current run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MeterError::TaskFailed { .. })
    }

    /// Whether the appliance is presumed unreachable. When true, no further
    /// calls (task stop, logout) are attempted for this run.
    pub fn is_transport(&self) -> bool {
        matches!(self, MeterError::Transport(_))
    }
}

impl From<config::ConfigError> for MeterError {
    fn from(err: config::ConfigError) -> Self {
        MeterError::Config(err.to_string())
    }
}
