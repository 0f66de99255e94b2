//! Backup outcome metrics

use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

use crate::errors::BackupError;

/// Counters for backup outcomes, owned by their own registry
#[derive(Clone)]
pub struct BackupMetrics {
    registry: Registry,
    pub success: IntCounter,
    pub error: IntCounter,
    pub skipped: IntCounter,
    pub upload_attempts: IntCounter,
}

impl BackupMetrics {
    /// Create the counters and register them. Exposed names carry the
    /// `_total` suffix.
    pub fn new() -> Result<Self, BackupError> {
        let registry = Registry::new();

        let success = IntCounter::new("chb_backup_success_total", "number of successful backups")?;
        let error = IntCounter::new("chb_backup_error_total", "number of errored backups")?;
        let skipped = IntCounter::new(
            "chb_backup_skipped_total",
            "number of backup runs skipped because another run was in progress",
        )?;
        let upload_attempts = IntCounter::new(
            "chb_backup_upload_attempts_total",
            "number of upload trigger attempts",
        )?;

        registry.register(Box::new(success.clone()))?;
        registry.register(Box::new(error.clone()))?;
        registry.register(Box::new(skipped.clone()))?;
        registry.register(Box::new(upload_attempts.clone()))?;

        Ok(Self {
            registry,
            success,
            error,
            skipped,
            upload_attempts,
        })
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> Result<String, BackupError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| BackupError::ServerError(e.to_string()))
    }
}
