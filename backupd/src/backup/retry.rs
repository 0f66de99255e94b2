//! Upload retrier

use std::time::Duration;

use tracing::{info, warn};

use crate::backup::api::BackupApi;
use crate::errors::BackupError;
use crate::utils::calc_jitter;

/// Upload retry options
#[derive(Debug, Clone)]
pub struct RetryOptions {
    /// Maximum number of upload trigger calls
    pub max_attempts: u32,

    /// Upper bound (exclusive) of the random delay after a failed attempt
    pub max_jitter: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            max_jitter: Duration::from_secs(5),
        }
    }
}

/// Outcome of the retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadReport {
    /// Number of trigger calls made
    pub attempts: u32,

    /// Whether one of them was accepted
    pub triggered: bool,
}

/// Trigger the upload of `backup_name`, retrying error responses with a
/// jittered delay. Success means the trigger was accepted, not that the upload
/// finished.
pub async fn retry_upload<A>(
    api: &A,
    backup_name: &str,
    options: &RetryOptions,
) -> Result<UploadReport, BackupError>
where
    A: BackupApi + ?Sized,
{
    let mut attempts = 0;

    while attempts < options.max_attempts {
        attempts += 1;
        let upload = api.upload_backup(backup_name).await?;

        if !upload.is_error() {
            info!(
                "Upload of '{}' triggered on attempt {}: {:?}",
                backup_name, attempts, upload
            );
            return Ok(UploadReport {
                attempts,
                triggered: true,
            });
        }

        warn!(
            "Received error on upload attempt {}/{} for '{}': {:?}",
            attempts, options.max_attempts, backup_name, upload
        );

        if attempts < options.max_attempts {
            let delay = calc_jitter(options.max_jitter);
            info!("Retrying upload in {:?}...", delay);
            tokio::time::sleep(delay).await;
        }
    }

    Ok(UploadReport {
        attempts,
        triggered: false,
    })
}
