//! Wait-for-completion

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::backup::api::BackupApi;
use crate::backup::status::check_status;
use crate::errors::BackupError;

/// Wait options
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Deadline measured from the first poll
    pub timeout: Duration,

    /// Delay between polls
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Poll until `command` reports success (`Ok(true)`) or the timeout elapses
/// (`Ok(false)`). At least one poll is always made. Poll errors are returned
/// immediately.
pub async fn await_completion<A>(
    api: &A,
    command: &str,
    options: &WaitOptions,
) -> Result<bool, BackupError>
where
    A: BackupApi + ?Sized,
{
    let started = Instant::now();
    let mut polls: u32 = 0;

    loop {
        polls += 1;
        if check_status(api, command).await? {
            info!(
                "Command '{}' completed after {:?} ({} polls)",
                command,
                started.elapsed(),
                polls
            );
            return Ok(true);
        }

        if started.elapsed() >= options.timeout {
            warn!(
                "Timed out after {:?} waiting for command '{}' ({} polls)",
                options.timeout, command, polls
            );
            return Ok(false);
        }

        debug!("Command '{}' not complete yet, polling again...", command);
        tokio::time::sleep(options.poll_interval).await;
    }
}
