//! Status poller

use tracing::{debug, warn};

use crate::backup::api::BackupApi;
use crate::errors::BackupError;
use crate::models::backup::parse_status_body;

/// Query the status endpoint once and report whether `command` completed
/// successfully.
///
/// A body holding zero or several records is reported as "not complete".
/// Transport errors and malformed records are returned as errors.
pub async fn check_status<A>(api: &A, command: &str) -> Result<bool, BackupError>
where
    A: BackupApi + ?Sized,
{
    let body = api.fetch_status().await?;
    debug!("Backup status for '{}': {}", command, body.trim_end());

    let mut docs = parse_status_body(&body)?;
    if docs.len() != 1 {
        warn!(
            "Expected exactly one status record, got {}: {}",
            docs.len(),
            body.trim_end()
        );
        return Ok(false);
    }

    let doc = docs.remove(0);
    if doc.command != command {
        debug!("Status reports '{}', waiting for '{}'", doc.command, command);
        return Ok(false);
    }

    if let Some(err) = doc.error.as_deref() {
        warn!("Command '{}' reports error: {}", command, err);
    }

    Ok(doc.is_success())
}
