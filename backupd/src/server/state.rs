//! Server state

use std::sync::Arc;

use crate::metrics::BackupMetrics;

/// Server state shared across handlers
pub struct ServerState {
    pub metrics: Arc<BackupMetrics>,
}

impl ServerState {
    pub fn new(metrics: Arc<BackupMetrics>) -> Self {
        Self { metrics }
    }
}
