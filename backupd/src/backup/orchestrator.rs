//! Backup orchestrator
//!
//! Drives one [`BackupRun`] through create, wait, upload and wait, and records
//! the outcome on the injected [`BackupMetrics`]. Every run increments exactly
//! one of the success or error counters; a run that finds another one in flight
//! is skipped and increments neither.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{error, info, info_span, warn, Instrument};

use crate::backup::api::BackupApi;
use crate::backup::fsm::{BackupEvent, BackupPhase, BackupRun, FailureReason};
use crate::backup::retry::{retry_upload, RetryOptions};
use crate::backup::wait::{await_completion, WaitOptions};
use crate::errors::BackupError;
use crate::metrics::BackupMetrics;
use crate::models::backup::{upload_command, CREATE_COMMAND};

/// Orchestrator settings
#[derive(Debug, Clone, Default)]
pub struct OrchestratorSettings {
    /// Wait applied to both the create and the upload command
    pub wait: WaitOptions,

    /// Upload trigger retries
    pub retry: RetryOptions,
}

/// Result of one orchestrator invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded { backup_name: String },
    Failed { reason: FailureReason },
    Skipped,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded { .. })
    }
}

/// Backup orchestrator
pub struct Orchestrator {
    api: Arc<dyn BackupApi>,
    metrics: Arc<BackupMetrics>,
    settings: OrchestratorSettings,
    run_lock: Mutex<()>,
}

impl Orchestrator {
    /// Create a new orchestrator
    pub fn new(
        api: Arc<dyn BackupApi>,
        metrics: Arc<BackupMetrics>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            api,
            metrics,
            settings,
            run_lock: Mutex::new(()),
        }
    }

    /// Run one full backup lifecycle. Never returns an error: failures are
    /// classified, logged and counted.
    pub async fn run_once(&self) -> RunOutcome {
        let Ok(_guard) = self.run_lock.try_lock() else {
            warn!("Backup run already in progress, skipping...");
            self.metrics.skipped.inc();
            return RunOutcome::Skipped;
        };

        let mut run = BackupRun::new();
        let span = info_span!("backup_run", run_id = %run.id());

        async {
            info!("Running backup...");

            if let Err(e) = self.drive(&mut run).await {
                error!("Backup run aborted in phase {:?}: {}", run.phase(), e);
                if let Err(e) = run.process(BackupEvent::Fail(FailureReason::from(e))) {
                    error!("Unable to mark run as failed: {}", e);
                }
            }

            self.finish(&run)
        }
        .instrument(span)
        .await
    }

    /// Advance the run until it reaches a terminal phase
    async fn drive(&self, run: &mut BackupRun) -> Result<(), BackupError> {
        loop {
            let event = match run.phase() {
                BackupPhase::Created => self.create().await?,
                BackupPhase::WaitingCreate => self.wait_create().await?,
                BackupPhase::Uploading => self.upload(run).await?,
                BackupPhase::WaitingUpload => self.wait_upload(run.backup_name()).await?,
                BackupPhase::Succeeded | BackupPhase::Failed => return Ok(()),
            };
            run.process(event)?;
        }
    }

    async fn create(&self) -> Result<BackupEvent, BackupError> {
        let backup = self.api.create_backup().await?;
        info!("Created backup: {:?}", backup);

        if !backup.is_acknowledged() {
            return Ok(BackupEvent::Fail(FailureReason::NotAcknowledged {
                status: backup.status,
            }));
        }

        Ok(BackupEvent::Acknowledged {
            backup_name: backup.backup_name,
        })
    }

    async fn wait_create(&self) -> Result<BackupEvent, BackupError> {
        if await_completion(self.api.as_ref(), CREATE_COMMAND, &self.settings.wait).await? {
            Ok(BackupEvent::CreateCompleted)
        } else {
            Ok(BackupEvent::Fail(FailureReason::CreateTimeout))
        }
    }

    async fn upload(&self, run: &mut BackupRun) -> Result<BackupEvent, BackupError> {
        let report = retry_upload(self.api.as_ref(), run.backup_name(), &self.settings.retry).await?;
        run.record_upload_attempts(report.attempts);
        self.metrics.upload_attempts.inc_by(u64::from(report.attempts));

        if report.triggered {
            Ok(BackupEvent::UploadTriggered)
        } else {
            Ok(BackupEvent::Fail(FailureReason::UploadExhausted {
                attempts: report.attempts,
            }))
        }
    }

    async fn wait_upload(&self, backup_name: &str) -> Result<BackupEvent, BackupError> {
        let command = upload_command(backup_name);
        if await_completion(self.api.as_ref(), &command, &self.settings.wait).await? {
            Ok(BackupEvent::UploadCompleted)
        } else {
            Ok(BackupEvent::Fail(FailureReason::UploadTimeout {
                backup_name: backup_name.to_string(),
            }))
        }
    }

    /// Count and log a terminal run
    fn finish(&self, run: &BackupRun) -> RunOutcome {
        let elapsed = (chrono::Utc::now() - run.started_at())
            .to_std()
            .unwrap_or(Duration::ZERO);

        match (run.phase(), run.failure()) {
            (BackupPhase::Succeeded, _) => {
                self.metrics.success.inc();
                info!(
                    "Backup '{}' created and uploaded in {:?} ({} upload attempts)",
                    run.backup_name(),
                    elapsed,
                    run.upload_attempts()
                );
                RunOutcome::Succeeded {
                    backup_name: run.backup_name().to_string(),
                }
            }
            (_, Some(reason)) => {
                self.metrics.error.inc();
                error!("Backup failed after {:?}: {}", elapsed, reason);
                RunOutcome::Failed {
                    reason: reason.clone(),
                }
            }
            (phase, None) => {
                self.metrics.error.inc();
                let reason = FailureReason::Error {
                    message: format!("run stopped in non-terminal phase {:?}", phase),
                };
                error!("Backup failed after {:?}: {}", elapsed, reason);
                RunOutcome::Failed { reason }
            }
        }
    }
}
