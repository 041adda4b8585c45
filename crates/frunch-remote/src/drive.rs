//! Google Drive v3 file source.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use frunch_core::defaults::{DRIVE_API_BASE, DRIVE_TIMEOUT_SECS};
use frunch_core::{ByteStream, ChangePage, Error, FileListPage, FileSource, Result};

/// Connection settings for [`DriveClient`].
#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// REST base URL, without the `/drive/v3` suffix.
    pub base_url: String,
    /// OAuth bearer token. Requests go out unauthenticated when absent.
    pub access_token: Option<String>,
    /// Timeout for metadata requests. Downloads are not bounded by it.
    pub timeout: Duration,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            base_url: DRIVE_API_BASE.to_string(),
            access_token: None,
            timeout: Duration::from_secs(DRIVE_TIMEOUT_SECS),
        }
    }
}

impl DriveConfig {
    /// Create from environment variables.
    ///
    /// - `DRIVE_API_BASE`: REST base URL
    /// - `DRIVE_ACCESS_TOKEN`: bearer token
    /// - `DRIVE_TIMEOUT_SECS`: metadata request timeout
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base) = std::env::var("DRIVE_API_BASE") {
            config.base_url = base;
        }
        config.access_token = std::env::var("DRIVE_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        if let Some(secs) = std::env::var("DRIVE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartPageToken {
    start_page_token: String,
}

/// File source backed by the Google Drive v3 REST API.
pub struct DriveClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
    timeout: Duration,
}

impl DriveClient {
    pub fn new(config: DriveConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        debug!(base_url = %config.base_url, authenticated = config.access_token.is_some(), "Initializing Drive client");

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token,
            timeout: config.timeout,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(DriveConfig::from_env())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/drive/v3{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let start = Instant::now();
        let request = self
            .authorize(self.client.get(self.url(path)))
            .query(query)
            .timeout(self.timeout);

        let response = request.send().await.map_err(|e| {
            warn!(path, error = %e, "Drive request failed");
            Error::Request(format!("drive {}: {}", path, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(path, status = %status, "Drive returned an error status");
            return Err(Error::Request(format!(
                "drive {} returned HTTP {}: {}",
                path, status, body
            )));
        }

        let parsed = response
            .json::<T>()
            .await
            .map_err(|e| Error::Serialization(format!("drive {}: {}", path, e)))?;
        debug!(path, duration_ms = start.elapsed().as_millis() as u64, "Drive request complete");
        Ok(parsed)
    }
}

#[async_trait]
impl FileSource for DriveClient {
    #[instrument(skip(self), fields(subsystem = "remote", component = "drive", op = "list_page"))]
    async fn list_page(&self, page_token: Option<&str>, page_size: u32) -> Result<FileListPage> {
        let mut query = vec![("pageSize", page_size.to_string()), ("fields", "*".to_string())];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        self.get_json("/files", &query).await
    }

    #[instrument(skip(self), fields(subsystem = "remote", component = "drive", op = "changes_page"))]
    async fn changes_page(&self, cursor: &str, page_size: u32) -> Result<ChangePage> {
        let query = [
            ("pageToken", cursor.to_string()),
            ("pageSize", page_size.to_string()),
            ("fields", "*".to_string()),
            ("includeRemoved", "true".to_string()),
        ];
        self.get_json("/changes", &query).await
    }

    #[instrument(skip(self), fields(subsystem = "remote", component = "drive", op = "start_cursor"))]
    async fn start_cursor(&self) -> Result<String> {
        let token: StartPageToken = self.get_json("/changes/startPageToken", &[]).await?;
        Ok(token.start_page_token)
    }

    #[instrument(skip(self), fields(subsystem = "remote", component = "drive", op = "download"))]
    async fn download_content(&self, id: &str) -> Result<ByteStream> {
        let path = format!("/files/{}", id);
        let response = self
            .authorize(self.client.get(self.url(&path)))
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(|e| Error::Request(format!("drive download {}: {}", id, e)))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(Error::NotFound(format!("remote file {}", id)));
            }
            status => {
                return Err(Error::Request(format!(
                    "drive download {} returned HTTP {}",
                    id, status
                )));
            }
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(Error::from))
            .boxed())
    }
}
