//! Application configuration options

use std::net::SocketAddr;
use std::time::Duration;

use crate::backup::orchestrator::OrchestratorSettings;
use crate::backup::retry::RetryOptions;
use crate::backup::wait::WaitOptions;
use crate::settings::Settings;
use crate::workers::scheduler;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// clickhouse-backup API base URL
    pub backup_base_url: String,

    /// Timeout of each HTTP call to the backup API
    pub request_timeout: Duration,

    /// Enable the metrics server
    pub enable_metrics_server: bool,

    /// Server configuration
    pub server: ServerOptions,

    /// Scheduler worker options
    pub scheduler: scheduler::Options,

    /// Backup run settings
    pub orchestrator: OrchestratorSettings,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            backup_base_url: "http://127.0.0.1:7171".to_string(),
            request_timeout: Duration::from_secs(10),
            enable_metrics_server: true,
            server: ServerOptions::default(),
            scheduler: scheduler::Options::default(),
            orchestrator: OrchestratorSettings::default(),
        }
    }
}

impl From<&Settings> for AppOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            backup_base_url: settings.backup_addr.clone(),
            request_timeout: settings.http_timeout,
            server: ServerOptions {
                addr: settings.metrics_addr,
            },
            scheduler: scheduler::Options {
                schedule: settings.schedule.clone(),
            },
            orchestrator: OrchestratorSettings {
                wait: WaitOptions {
                    timeout: settings.wait_time,
                    ..Default::default()
                },
                retry: RetryOptions {
                    max_attempts: settings.upload_attempts,
                    ..Default::default()
                },
            },
            ..Default::default()
        }
    }
}

/// Lifecycle options
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown, in-flight runs included
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Metrics HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Address to bind to
    pub addr: SocketAddr,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 1337)),
        }
    }
}
