//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::backup::orchestrator::Orchestrator;
use crate::errors::BackupError;
use crate::http::client::HttpClient;
use crate::metrics::BackupMetrics;

/// Main application state
pub struct AppState {
    /// Backup outcome counters
    pub metrics: Arc<BackupMetrics>,

    /// Backup orchestrator
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Initialize application state
    pub fn init(options: &AppOptions) -> Result<Self, BackupError> {
        info!("Initializing application state...");

        let http_client = Arc::new(HttpClient::new(
            &options.backup_base_url,
            options.request_timeout,
        )?);

        let metrics = Arc::new(BackupMetrics::new()?);

        let orchestrator = Arc::new(Orchestrator::new(
            http_client,
            metrics.clone(),
            options.orchestrator.clone(),
        ));

        Ok(Self {
            metrics,
            orchestrator,
        })
    }
}
