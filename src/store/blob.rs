//! Firebase Storage upload client.
//!
//! Uploads use the simple media endpoint (`POST /v0/b/{bucket}/o?name=..`).
//! The response carries a download token that is folded into a public
//! `alt=media` URL.

use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use crate::config::{Settings, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::error::{Error, Result};

use super::BlobStore;

pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://firebasestorage.googleapis.com";

/// Blob store backed by a Firebase Storage bucket.
#[derive(Debug, Clone)]
pub struct FirebaseBlobStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: Option<String>,
    api_key: Option<String>,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    #[serde(default)]
    download_tokens: Option<String>,
}

impl FirebaseBlobStore {
    /// Create a store for `bucket`. With no bucket every upload fails, which
    /// sends photos down the inline path.
    #[must_use]
    pub fn new(bucket: Option<String>, api_key: Option<String>) -> Self {
        Self::with_endpoint(DEFAULT_STORAGE_ENDPOINT, bucket, api_key)
    }

    #[must_use]
    pub fn with_endpoint(endpoint: &str, bucket: Option<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket,
            api_key,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let mut store = Self::new(settings.storage_bucket.clone(), settings.firebase_api_key.clone());
        store.timeout = settings.request_timeout;
        store
    }

    fn bucket_url(&self, bucket: &str) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| Error::Config(format!("Invalid storage endpoint {}: {e}", self.endpoint)))?;
        url.path_segments_mut()
            .map_err(|()| Error::Config("Storage endpoint cannot be a base URL".into()))?
            .pop_if_empty()
            .extend(["v0", "b", bucket, "o"]);
        Ok(url)
    }

    /// Public download URL for an uploaded object.
    fn download_url(&self, bucket: &str, key: &str, token: &str) -> Result<String> {
        let mut url = self.bucket_url(bucket)?;
        url.path_segments_mut()
            .map_err(|()| Error::Config("Storage endpoint cannot be a base URL".into()))?
            .push(key);
        url.query_pairs_mut()
            .append_pair("alt", "media")
            .append_pair("token", token);
        Ok(url.into())
    }
}

impl BlobStore for FirebaseBlobStore {
    async fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        let bucket = self
            .bucket
            .as_deref()
            .ok_or_else(|| Error::Upload("no storage bucket configured".into()))?;

        let mut request = self
            .client
            .post(self.bucket_url(bucket)?)
            .timeout(self.timeout)
            .query(&[("name", key)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes.to_vec());
        if let Some(api_key) = &self.api_key {
            request = request.query(&[("key", api_key.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Upload(format!("upload request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upload(format!("upload failed ({status}): {body}")));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| Error::Upload(format!("failed to parse upload response: {e}")))?;
        let token = parsed
            .download_tokens
            .as_deref()
            .and_then(|t| t.split(',').next())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Upload("upload response has no download token".into()))?;

        debug!(key, size = bytes.len(), "Photo uploaded");
        self.download_url(bucket, key, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_url_encodes_key() {
        let store = FirebaseBlobStore::with_endpoint("http://localhost:9199/", Some("b".into()), None);
        let url = store
            .download_url("campus.appspot.com", "issues/17_leak.jpg", "tok")
            .unwrap();
        assert_eq!(
            url,
            "http://localhost:9199/v0/b/campus.appspot.com/o/issues%2F17_leak.jpg?alt=media&token=tok"
        );
    }

    #[tokio::test]
    async fn test_upload_without_bucket_fails() {
        let store = FirebaseBlobStore::new(None, None);
        let err = store.upload("issues/x.jpg", b"data", "image/jpeg").await.unwrap_err();
        assert!(matches!(err, Error::Upload(_)));
    }
}
