//! Error types for the backup orchestrator

use thiserror::Error;

/// Main error type for the backup orchestrator
///
/// Expected run failures (not acknowledged, timeouts, exhausted uploads) are
/// not errors; see [`crate::backup::fsm::FailureReason`].
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Backup API returned {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Schedule error: {0}")]
    ScheduleError(String),

    #[error("Metrics error: {0}")]
    MetricsError(#[from] prometheus::Error),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),
}
