//! HTTP client implementation

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, error};
use url::Url;

use crate::errors::BackupError;

/// HTTP client for the clickhouse-backup API
pub struct HttpClient {
    client: Client,
    base_url: Url,
}

/// Raw response: status code plus body text
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpClient {
    /// Create a new HTTP client. `request_timeout` bounds every single call.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, BackupError> {
        let url = Url::parse(base_url)
            .map_err(|e| BackupError::ConfigError(format!("invalid base url {}: {}", base_url, e)))?;
        if url.cannot_be_a_base() {
            return Err(BackupError::ConfigError(format!(
                "invalid base url {}: cannot hold a path",
                base_url
            )));
        }

        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            client,
            base_url: url,
        })
    }

    /// Resolve an endpoint below the base URL. Each segment is percent-encoded
    /// on its own, so a segment never spans path separators or leaks into the
    /// query or fragment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, BackupError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                BackupError::ConfigError(format!("base url {} cannot hold a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Make a GET request and return the body as text. Non-2xx is an error.
    pub async fn get_text(&self, segments: &[&str]) -> Result<String, BackupError> {
        let url = self.endpoint(segments)?;
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("HTTP GET failed: {} - {}", status, body);
            return Err(BackupError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    /// Make a POST request without a body, returning status and body as-is
    pub async fn post_raw(&self, segments: &[&str]) -> Result<RawResponse, BackupError> {
        let url = self.endpoint(segments)?;
        debug!("POST {}", url);

        let response = self.client.post(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(RawResponse { status, body })
    }
}
