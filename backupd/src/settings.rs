//! Environment settings
//!
//! Variable names are an operator contract and must not change.

use std::net::SocketAddr;
use std::time::Duration;

use serde::Serialize;

use crate::errors::BackupError;
use crate::logs::{LogFormat, LogLevel};
use crate::utils::parse_secs;

pub const ENV_BACKUP_ADDR: &str = "CLICKHOUSE_BACKUP_ADDR";
pub const ENV_SCHEDULE: &str = "BACKUP_SCHEDULE";
pub const ENV_WAIT_TIME: &str = "BACKUP_WAIT_TIME";
pub const ENV_HTTP_TIMEOUT: &str = "BACKUP_HTTP_TIMEOUT";
pub const ENV_UPLOAD_ATTEMPTS: &str = "BACKUP_UPLOAD_ATTEMPTS";
pub const ENV_METRICS_ADDR: &str = "METRICS_ADDR";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";
pub const ENV_LOG_DIR: &str = "LOG_DIR";

/// Daily at midnight. Earlier releases defaulted to `* * */24 * *`, which
/// fires every minute on the 1st and 25th of each month.
pub const DEFAULT_SCHEDULE: &str = "0 0 * * *";

/// Orchestrator settings
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    /// Base URL of the clickhouse-backup API
    pub backup_addr: String,

    /// Cron expression for backup runs
    pub schedule: String,

    /// Timeout of each wait-for-completion
    pub wait_time: Duration,

    /// Timeout of each HTTP call
    pub http_timeout: Duration,

    /// Upload trigger retry budget
    pub upload_attempts: u32,

    /// Bind address of the metrics server
    pub metrics_addr: SocketAddr,

    pub log_level: LogLevel,

    pub log_format: LogFormat,

    /// Also write rolling log files here
    pub log_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backup_addr: "http://127.0.0.1:7171".to_string(),
            schedule: DEFAULT_SCHEDULE.to_string(),
            wait_time: Duration::from_secs(30),
            http_timeout: Duration::from_secs(10),
            upload_attempts: 5,
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 1337)),
            log_level: LogLevel::Info,
            log_format: LogFormat::Text,
            log_dir: None,
        }
    }
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self, BackupError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; unset or empty variables keep their
    /// defaults.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, BackupError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut settings = Settings::default();

        if let Some(addr) = get(ENV_BACKUP_ADDR) {
            url::Url::parse(&addr)
                .map_err(|e| invalid(ENV_BACKUP_ADDR, &addr, &e.to_string()))?;
            settings.backup_addr = addr;
        }

        if let Some(schedule) = get(ENV_SCHEDULE) {
            settings.schedule = schedule.trim().to_string();
        }

        if let Some(value) = get(ENV_WAIT_TIME) {
            settings.wait_time = parse_secs(&value)
                .ok_or_else(|| invalid(ENV_WAIT_TIME, &value, "expected seconds"))?;
        }

        if let Some(value) = get(ENV_HTTP_TIMEOUT) {
            settings.http_timeout = parse_secs(&value)
                .filter(|d| !d.is_zero())
                .ok_or_else(|| invalid(ENV_HTTP_TIMEOUT, &value, "expected positive seconds"))?;
        }

        if let Some(value) = get(ENV_UPLOAD_ATTEMPTS) {
            settings.upload_attempts = value
                .trim()
                .parse()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| invalid(ENV_UPLOAD_ATTEMPTS, &value, "expected an integer >= 1"))?;
        }

        if let Some(value) = get(ENV_METRICS_ADDR) {
            settings.metrics_addr = value
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_METRICS_ADDR, &value, "expected host:port"))?;
        }

        if let Some(value) = get(ENV_LOG_LEVEL) {
            settings.log_level = value
                .parse()
                .map_err(|e: String| invalid(ENV_LOG_LEVEL, &value, &e))?;
        }

        if let Some(value) = get(ENV_LOG_FORMAT) {
            settings.log_format = value
                .parse()
                .map_err(|e: String| invalid(ENV_LOG_FORMAT, &value, &e))?;
        }

        settings.log_dir = get(ENV_LOG_DIR);

        Ok(settings)
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> BackupError {
    BackupError::ConfigError(format!("{}={:?}: {}", key, value, reason))
}
