//! Finite State Machine for a single backup run

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::BackupError;

/// Backup run phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupPhase {
    /// Run started, create not yet acknowledged
    Created,

    /// Waiting for the create command to finish
    WaitingCreate,

    /// Triggering the upload
    Uploading,

    /// Waiting for the upload command to finish
    WaitingUpload,

    /// Backup created and uploaded
    Succeeded,

    /// Run failed
    Failed,
}

impl BackupPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BackupPhase::Succeeded | BackupPhase::Failed)
    }
}

/// Why a run failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Create response carried a status other than "acknowledged"
    NotAcknowledged { status: String },

    /// Create did not complete before the deadline
    CreateTimeout,

    /// Every upload trigger attempt reported an error
    UploadExhausted { attempts: u32 },

    /// Upload did not complete before the deadline
    UploadTimeout { backup_name: String },

    /// Transport, parse or protocol failure
    Error { message: String },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NotAcknowledged { status } => {
                write!(f, "backup creation not acknowledged (status: {})", status)
            }
            FailureReason::CreateTimeout => write!(f, "timed out waiting for backup creation"),
            FailureReason::UploadExhausted { attempts } => {
                write!(f, "upload failed after {} attempts", attempts)
            }
            FailureReason::UploadTimeout { backup_name } => {
                write!(f, "timed out waiting for upload of {}", backup_name)
            }
            FailureReason::Error { message } => write!(f, "{}", message),
        }
    }
}

impl From<BackupError> for FailureReason {
    fn from(err: BackupError) -> Self {
        FailureReason::Error {
            message: err.to_string(),
        }
    }
}

/// Backup run event
#[derive(Debug, Clone)]
pub enum BackupEvent {
    /// Create accepted, remote assigned a name
    Acknowledged { backup_name: String },

    /// Create command finished
    CreateCompleted,

    /// Upload trigger accepted
    UploadTriggered,

    /// Upload command finished
    UploadCompleted,

    /// Abort the run
    Fail(FailureReason),
}

/// A single backup lifecycle execution
#[derive(Debug, Clone)]
pub struct BackupRun {
    id: Uuid,
    backup_name: String,
    phase: BackupPhase,
    upload_attempts: u32,
    started_at: DateTime<Utc>,
    failure: Option<FailureReason>,
}

impl BackupRun {
    /// Create a new run in the `Created` phase
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            backup_name: String::new(),
            phase: BackupPhase::Created,
            upload_attempts: 0,
            started_at: Utc::now(),
            failure: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Name assigned by the remote, empty until the create is acknowledged
    pub fn backup_name(&self) -> &str {
        &self.backup_name
    }

    pub fn phase(&self) -> BackupPhase {
        self.phase
    }

    pub fn upload_attempts(&self) -> u32 {
        self.upload_attempts
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        self.failure.as_ref()
    }

    /// Record upload trigger calls made during the `Uploading` phase
    pub fn record_upload_attempts(&mut self, attempts: u32) {
        self.upload_attempts += attempts;
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: BackupEvent) -> Result<(), BackupError> {
        let new_phase = match (self.phase, event) {
            (BackupPhase::Created, BackupEvent::Acknowledged { backup_name }) => {
                self.backup_name = backup_name;
                BackupPhase::WaitingCreate
            }
            (BackupPhase::WaitingCreate, BackupEvent::CreateCompleted) => BackupPhase::Uploading,
            (BackupPhase::Uploading, BackupEvent::UploadTriggered) => BackupPhase::WaitingUpload,
            (BackupPhase::WaitingUpload, BackupEvent::UploadCompleted) => BackupPhase::Succeeded,

            // Failed is reachable from every non-terminal phase
            (phase, BackupEvent::Fail(reason)) if !phase.is_terminal() => {
                self.failure = Some(reason);
                BackupPhase::Failed
            }

            // Invalid transitions
            (phase, event) => {
                return Err(BackupError::InvalidTransition(format!(
                    "{:?} -> {:?}",
                    phase, event
                )));
            }
        };

        self.phase = new_phase;
        Ok(())
    }
}

impl Default for BackupRun {
    fn default() -> Self {
        Self::new()
    }
}
