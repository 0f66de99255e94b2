//! Backup API seam

use async_trait::async_trait;

use crate::errors::BackupError;
use crate::models::backup::{CreateBackupResponse, UploadResponse};

/// Backup API trait for testability
#[async_trait]
pub trait BackupApi: Send + Sync {
    /// Trigger a new backup
    async fn create_backup(&self) -> Result<CreateBackupResponse, BackupError>;

    /// Trigger an upload of an existing backup
    async fn upload_backup(&self, backup_name: &str) -> Result<UploadResponse, BackupError>;

    /// Fetch the raw status body (newline-delimited JSON)
    async fn fetch_status(&self) -> Result<String, BackupError>;
}
