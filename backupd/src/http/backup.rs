//! clickhouse-backup API client

use async_trait::async_trait;
use tracing::{error, warn};

use crate::backup::api::BackupApi;
use crate::errors::BackupError;
use crate::http::client::HttpClient;
use crate::models::backup::{CreateBackupResponse, UploadResponse};

#[async_trait]
impl BackupApi for HttpClient {
    async fn create_backup(&self) -> Result<CreateBackupResponse, BackupError> {
        let response = self.post_raw(&["backup", "create"]).await?;

        if !response.status.is_success() {
            error!("Backup create failed: {} - {}", response.status, response.body);
            return Err(BackupError::ApiError {
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        Ok(serde_json::from_str(&response.body)?)
    }

    async fn upload_backup(&self, backup_name: &str) -> Result<UploadResponse, BackupError> {
        let response = self.post_raw(&["backup", "upload", backup_name]).await?;

        if response.status.is_success() {
            return Ok(serde_json::from_str(&response.body)?);
        }

        // A busy server answers with a non-2xx code and {"status":"error"}
        match serde_json::from_str::<UploadResponse>(&response.body) {
            Ok(upload) => {
                warn!("Backup upload returned {}: {}", response.status, response.body);
                Ok(upload)
            }
            Err(_) => Err(BackupError::ApiError {
                status: response.status.as_u16(),
                body: response.body,
            }),
        }
    }

    async fn fetch_status(&self) -> Result<String, BackupError> {
        self.get_text(&["backup", "status"]).await
    }
}
