//! Firestore mirror over the REST v1 API.
//!
//! Issues live in the `issues` collection, one document per issue, keyed by
//! the primary id so both stores share an identity. Field values use
//! Firestore's typed encoding (`{"stringValue": ..}` / `{"nullValue": null}`);
//! `created_at` is an RFC 3339 string so lexical order is time order.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{StatusCode, Url};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::{Settings, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::error::{Error, Result};
use crate::model::{Issue, IssueStatus, Priority, DEFAULT_CATEGORY};

use super::SecondaryStore;

pub const DEFAULT_FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com/v1";
const COLLECTION: &str = "issues";

/// Firestore-backed secondary store.
#[derive(Debug, Clone)]
pub struct FirestoreStore {
    client: reqwest::Client,
    documents: Url,
    api_key: Option<String>,
    timeout: Duration,
}

impl FirestoreStore {
    /// Create a store for `project_id` against the public endpoint.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the resulting URL is invalid.
    pub fn new(project_id: &str, api_key: Option<String>) -> Result<Self> {
        Self::with_endpoint(DEFAULT_FIRESTORE_ENDPOINT, project_id, api_key)
    }

    /// Create a store against a custom endpoint (emulator or test server).
    ///
    /// # Errors
    ///
    /// Returns `Config` if the resulting URL is invalid.
    pub fn with_endpoint(endpoint: &str, project_id: &str, api_key: Option<String>) -> Result<Self> {
        let root = format!(
            "{}/projects/{project_id}/databases/(default)/documents",
            endpoint.trim_end_matches('/')
        );
        let documents = Url::parse(&root)
            .map_err(|e| Error::Config(format!("Invalid Firestore endpoint {root}: {e}")))?;

        Ok(Self {
            client: reqwest::Client::new(),
            documents,
            api_key,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }

    /// # Errors
    ///
    /// Returns `Config` if no project id is configured.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let project_id = settings
            .firebase_project_id
            .as_deref()
            .ok_or_else(|| Error::Config("Firestore mirror needs a project id".into()))?;
        let mut store = Self::new(project_id, settings.firebase_api_key.clone())?;
        store.timeout = settings.request_timeout;
        Ok(store)
    }

    fn document_url(&self, id: &str) -> Result<Url> {
        let mut url = self.documents.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Config("Firestore endpoint cannot be a base URL".into()))?
            .push(COLLECTION)
            .push(id);
        Ok(url)
    }

    fn query_url(&self) -> String {
        format!("{}:runQuery", self.documents.as_str().trim_end_matches('/'))
    }

    fn with_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.query(&[("key", key.as_str())]),
            None => request,
        }
    }
}

fn string_value(s: &str) -> Value {
    json!({ "stringValue": s })
}

fn optional_string(s: Option<&str>) -> Value {
    s.map_or_else(|| json!({ "nullValue": null }), string_value)
}

/// Encode the mirrored fields of an issue. Inline image payloads stay out.
fn issue_fields(issue: &Issue) -> Value {
    let mut fields = Map::new();
    fields.insert("id".into(), string_value(&issue.id));
    fields.insert("building".into(), string_value(&issue.building));
    fields.insert("description".into(), string_value(&issue.description));
    fields.insert("image_url".into(), optional_string(issue.image_url.as_deref()));
    fields.insert("category".into(), string_value(&issue.category));
    fields.insert("priority".into(), string_value(issue.priority.as_str()));
    fields.insert("status".into(), string_value(issue.status.as_str()));
    fields.insert(
        "created_at".into(),
        string_value(&issue.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    if let Some(email) = &issue.user_email {
        fields.insert("user_email".into(), string_value(email));
    }
    Value::Object(fields)
}

fn read_string(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)?
        .get("stringValue")?
        .as_str()
        .map(str::to_string)
}

fn read_timestamp(fields: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    let value = fields.get(key)?;
    let raw = value
        .get("stringValue")
        .or_else(|| value.get("timestampValue"))?
        .as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Decode a Firestore document into an issue.
fn document_to_issue(document: &Value) -> Result<Issue> {
    let name = document.get("name").and_then(Value::as_str).unwrap_or_default();
    let fields = document
        .get("fields")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::Secondary(format!("document {name} has no fields")))?;

    let id = name
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| read_string(fields, "id"))
        .ok_or_else(|| Error::Secondary("document without id".into()))?;

    let status = read_string(fields, "status")
        .ok_or_else(|| Error::Secondary(format!("document {id} has no status")))?
        .parse::<IssueStatus>()
        .map_err(|e| Error::Secondary(format!("document {id}: {e}")))?;

    let created_at = read_timestamp(fields, "created_at")
        .ok_or_else(|| Error::Secondary(format!("document {id} has no valid created_at")))?;

    Ok(Issue {
        building: read_string(fields, "building").unwrap_or_default(),
        description: read_string(fields, "description").unwrap_or_default(),
        image_url: read_string(fields, "image_url"),
        image_base64: None,
        category: read_string(fields, "category").unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        priority: read_string(fields, "priority").map_or(Priority::Medium, |p| Priority::from_label(&p)),
        status,
        created_at,
        user_email: read_string(fields, "user_email"),
        id,
    })
}

async fn check_status(response: reqwest::Response, operation: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Secondary(format!("Firestore {operation} failed ({status}): {body}")))
}

impl SecondaryStore for FirestoreStore {
    fn name(&self) -> &'static str {
        "firestore"
    }

    async fn mirror_issue(&self, issue: &Issue) -> Result<()> {
        let url = self.document_url(&issue.id)?;
        let request = self
            .client
            .patch(url)
            .timeout(self.timeout)
            .json(&json!({ "fields": issue_fields(issue) }));

        let response = self
            .with_key(request)
            .send()
            .await
            .map_err(|e| Error::Secondary(format!("Firestore write request failed: {e}")))?;
        check_status(response, "write").await?;

        debug!(issue_id = %issue.id, "Issue mirrored to Firestore");
        Ok(())
    }

    async fn update_status(&self, id: &str, status: IssueStatus) -> Result<()> {
        let url = self.document_url(id)?;
        let request = self
            .client
            .patch(url)
            .timeout(self.timeout)
            .query(&[
                ("updateMask.fieldPaths", "status"),
                ("currentDocument.exists", "true"),
            ])
            .json(&json!({ "fields": { "status": string_value(status.as_str()) } }));

        let response = self
            .with_key(request)
            .send()
            .await
            .map_err(|e| Error::Secondary(format!("Firestore update request failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::IssueNotFound { id: id.to_string() });
        }
        check_status(response, "update").await?;
        Ok(())
    }

    async fn list_issues(&self) -> Result<Vec<Issue>> {
        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": COLLECTION }],
                "orderBy": [{
                    "field": { "fieldPath": "created_at" },
                    "direction": "DESCENDING"
                }]
            }
        });
        let request = self
            .client
            .post(self.query_url())
            .timeout(self.timeout)
            .json(&query);

        let response = self
            .with_key(request)
            .send()
            .await
            .map_err(|e| Error::Secondary(format!("Firestore query request failed: {e}")))?;

        let rows: Vec<Value> = check_status(response, "query")
            .await?
            .json()
            .await
            .map_err(|e| Error::Secondary(format!("Failed to parse Firestore query: {e}")))?;

        let mut issues = Vec::with_capacity(rows.len());
        for row in &rows {
            // Rows without a document only carry a readTime.
            let Some(document) = row.get("document") else {
                continue;
            };
            match document_to_issue(document) {
                Ok(issue) => issues.push(issue),
                Err(e) => warn!(error = %e, "Skipping malformed Firestore document"),
            }
        }
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_issue() -> Issue {
        Issue {
            id: "4f1c2a".into(),
            building: "Engineering Hall".into(),
            description: "Sparking outlet".into(),
            image_url: None,
            image_base64: Some("AAAA".into()),
            category: "Electrical".into(),
            priority: Priority::Critical,
            status: IssueStatus::Open,
            created_at: Utc.with_ymd_and_hms(2025, 2, 3, 4, 5, 6).unwrap(),
            user_email: Some("user@campus.edu".into()),
        }
    }

    #[test]
    fn test_document_url() {
        let store = FirestoreStore::with_endpoint("http://localhost:8080/v1/", "demo", None).unwrap();
        assert_eq!(
            store.document_url("abc").unwrap().as_str(),
            "http://localhost:8080/v1/projects/demo/databases/(default)/documents/issues/abc"
        );
        assert_eq!(
            store.query_url(),
            "http://localhost:8080/v1/projects/demo/databases/(default)/documents:runQuery"
        );
    }

    #[test]
    fn test_fields_encoding_drops_inline_image() {
        let fields = issue_fields(&sample_issue());
        assert_eq!(fields["building"]["stringValue"], "Engineering Hall");
        assert_eq!(fields["priority"]["stringValue"], "Critical");
        assert!(fields["image_url"]["nullValue"].is_null());
        assert!(fields.get("image_base64").is_none());
        assert_eq!(fields["created_at"]["stringValue"], "2025-02-03T04:05:06.000Z");
    }

    #[test]
    fn test_document_round_trip() {
        let issue = sample_issue();
        let document = json!({
            "name": "projects/demo/databases/(default)/documents/issues/4f1c2a",
            "fields": issue_fields(&issue),
        });
        let decoded = document_to_issue(&document).unwrap();
        assert_eq!(decoded.id, issue.id);
        assert_eq!(decoded.status, issue.status);
        assert_eq!(decoded.priority, issue.priority);
        assert_eq!(decoded.created_at, issue.created_at);
        assert!(decoded.image_base64.is_none());
    }

    #[test]
    fn test_document_with_lowercase_priority_and_timestamp_value() {
        let document = json!({
            "name": "projects/demo/databases/(default)/documents/issues/xyz",
            "fields": {
                "building": {"stringValue": "Cafeteria"},
                "description": {"stringValue": "Leak"},
                "priority": {"stringValue": "high"},
                "status": {"stringValue": "Resolved"},
                "created_at": {"timestampValue": "2025-01-01T00:00:00Z"}
            }
        });
        let issue = document_to_issue(&document).unwrap();
        assert_eq!(issue.id, "xyz");
        assert_eq!(issue.priority, Priority::High);
        assert_eq!(issue.category, "Other");
        assert_eq!(issue.status, IssueStatus::Resolved);
    }

    #[test]
    fn test_document_without_created_at_rejected() {
        let document = json!({
            "name": "projects/demo/databases/(default)/documents/issues/xyz",
            "fields": { "status": {"stringValue": "Open"} }
        });
        assert!(document_to_issue(&document).is_err());
    }
}
