//! REST client for the primary issue API.
//!
//! Endpoints (relative to `{backend}/api`):
//! - `GET /issues` → `[Issue]`
//! - `POST /issues` `{building, description, image_url?, image_base64?}` → `Issue`
//! - `PATCH /issues/{id}` `{status}`
//! - `GET /stats` → `StatsSummary`
//! - `POST /analyze` `{description, image_base64?}` → `{category, priority}`

use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::Serialize;
use tracing::warn;

use crate::config::{Settings, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::error::{Error, Result};
use crate::model::{AnalyzeResult, Issue, IssueStatus, NewIssue, StatsSummary};

use super::PrimaryStore;

/// HTTP client for the primary store.
#[derive(Debug, Clone)]
pub struct RestPrimaryStore {
    client: reqwest::Client,
    api_base: String,
    request_timeout: Duration,
}

impl RestPrimaryStore {
    /// Create a client for `api_base` (e.g. `https://host/api`).
    pub fn new(api_base: impl Into<String>) -> Self {
        Self::with_timeout(api_base, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    /// Create a client with a custom timeout for reads and status patches.
    ///
    /// Creates are bounded by the synchronizer instead.
    pub fn with_timeout(api_base: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            request_timeout,
        }
    }

    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_timeout(settings.api_base(), settings.request_timeout)
    }

    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    /// URL of one issue; the id is percent-encoded as a single segment.
    fn issue_url(&self, id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| Error::Config(format!("Invalid API base {}: {e}", self.api_base)))?;
        url.path_segments_mut()
            .map_err(|()| Error::Config("API base cannot be a base URL".into()))?
            .pop_if_empty()
            .extend(["issues", id]);
        Ok(url)
    }

    fn send_error(&self, operation: &'static str, e: &reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                operation,
                seconds: self.request_timeout.as_secs(),
            }
        } else {
            Error::Primary(format!("{operation} request failed: {e}"))
        }
    }
}

/// Turn a non-2xx response into a primary-store error.
async fn check_status(response: reqwest::Response, operation: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::SERVICE_UNAVAILABLE => {
            Error::Primary(format!("{operation}: database unavailable"))
        }
        _ => Error::Primary(format!("{operation} failed ({status}): {body}")),
    })
}

/// Decode list rows one by one, dropping any the model cannot represent.
fn decode_issue_rows(rows: Vec<serde_json::Value>) -> Vec<Issue> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.get("id").and_then(serde_json::Value::as_str).map(str::to_string);
            match serde_json::from_value::<Issue>(row) {
                Ok(issue) => Some(issue),
                Err(e) => {
                    warn!(issue_id = id.as_deref().unwrap_or("?"), error = %e, "Skipping malformed issue row");
                    None
                }
            }
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct StatusPatch {
    status: IssueStatus,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    description: &'a str,
    image_base64: Option<&'a str>,
}

impl PrimaryStore for RestPrimaryStore {
    async fn list_issues(&self) -> Result<Vec<Issue>> {
        let response = self
            .client
            .get(self.url("issues"))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.send_error("list issues", &e))?;

        let rows: Vec<serde_json::Value> = check_status(response, "list issues")
            .await?
            .json()
            .await
            .map_err(|e| Error::Primary(format!("Failed to parse issue list: {e}")))?;

        Ok(decode_issue_rows(rows))
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<Issue> {
        let response = self
            .client
            .post(self.url("issues"))
            .json(issue)
            .send()
            .await
            .map_err(|e| self.send_error("create issue", &e))?;

        check_status(response, "create issue")
            .await?
            .json()
            .await
            .map_err(|e| Error::Primary(format!("Failed to parse created issue: {e}")))
    }

    async fn update_status(&self, id: &str, status: IssueStatus) -> Result<()> {
        let response = self
            .client
            .patch(self.issue_url(id)?)
            .timeout(self.request_timeout)
            .json(&StatusPatch { status })
            .send()
            .await
            .map_err(|e| self.send_error("update status", &e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::IssueNotFound { id: id.to_string() });
        }
        check_status(response, "update status").await?;
        Ok(())
    }

    async fn stats(&self) -> Result<StatsSummary> {
        let response = self
            .client
            .get(self.url("stats"))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.send_error("fetch stats", &e))?;

        check_status(response, "fetch stats")
            .await?
            .json()
            .await
            .map_err(|e| Error::Primary(format!("Failed to parse stats: {e}")))
    }

    async fn analyze(&self, description: &str, image_base64: Option<&str>) -> Result<AnalyzeResult> {
        let response = self
            .client
            .post(self.url("analyze"))
            .timeout(self.request_timeout)
            .json(&AnalyzeRequest {
                description,
                image_base64,
            })
            .send()
            .await
            .map_err(|e| self.send_error("analyze", &e))?;

        check_status(response, "analyze")
            .await?
            .json()
            .await
            .map_err(|e| Error::Primary(format!("Failed to parse analysis: {e}")))
    }
}
