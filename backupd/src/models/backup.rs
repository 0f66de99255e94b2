//! clickhouse-backup API models

use serde::{Deserialize, Serialize};

use crate::errors::BackupError;

/// Status value the create endpoint returns when it accepted the request
pub const STATUS_ACKNOWLEDGED: &str = "acknowledged";

/// Status value the status endpoint reports for a finished command
pub const STATUS_SUCCESS: &str = "success";

/// Status value the upload endpoint returns when the trigger failed
pub const STATUS_ERROR: &str = "error";

/// Command name reported by the status endpoint for a create
pub const CREATE_COMMAND: &str = "create";

/// Command name reported by the status endpoint for an upload of `backup_name`
pub fn upload_command(backup_name: &str) -> String {
    format!("upload {}", backup_name)
}

/// Response to `POST /backup/create`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateBackupResponse {
    /// "acknowledged" when the backup was accepted
    pub status: String,

    /// Name the remote assigned to the backup
    #[serde(default)]
    pub backup_name: String,
}

impl CreateBackupResponse {
    pub fn is_acknowledged(&self) -> bool {
        self.status == STATUS_ACKNOWLEDGED
    }
}

/// Response to `POST /backup/upload/{name}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    pub status: String,

    /// Error detail, present on some error responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResponse {
    pub fn is_error(&self) -> bool {
        self.status == STATUS_ERROR
    }
}

/// One record of the `GET /backup/status` body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusDocument {
    /// Command the record reports on
    pub command: String,

    /// Command status: "in progress", "success", "error"
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusDocument {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// Parse a newline-delimited status body. Blank lines are skipped; a line that
/// is not a valid status record is an error.
pub fn parse_status_body(body: &str) -> Result<Vec<StatusDocument>, BackupError> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str::<StatusDocument>(line).map_err(BackupError::from))
        .collect()
}
