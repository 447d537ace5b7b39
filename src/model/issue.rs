//! Issue model for the campus reporter.
//!
//! Issues are facility reports (building + description + optional photo).
//! The Primary Store assigns `id`, `category`, `priority`, `status` and
//! `created_at`; the core only ever mutates `status`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Issue status values.
///
/// Any status may move to any other; there is no enforced order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IssueStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
}

impl IssueStatus {
    /// All statuses in display order.
    pub const ALL: [Self; 3] = [Self::Open, Self::InProgress, Self::Resolved];

    /// Wire/display label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
        }
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IssueStatus {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::validate::normalize_status(s)
    }
}

impl Serialize for IssueStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for IssueStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Priority assigned by the categorization backend.
///
/// Read case-insensitively; anything missing or unrecognized is `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Wire/display label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    /// Lenient parse: never fails, falls back to `Medium`.
    #[must_use]
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            "critical" => Self::Critical,
            _ => Self::Medium,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map_or(Self::Medium, Self::from_label))
    }
}

/// Category used when the backend assigns none.
pub const DEFAULT_CATEGORY: &str = "Other";

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// A facility issue as held by either store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Primary-assigned identifier, also the mirror document key.
    pub id: String,

    /// One of [`crate::validate::BUILDINGS`].
    pub building: String,

    /// Free-text description.
    pub description: String,

    /// Blob storage URL, present only if the upload succeeded.
    #[serde(default)]
    pub image_url: Option<String>,

    /// Inline base64 JPEG, present only if the upload failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub status: IssueStatus,

    pub created_at: DateTime<Utc>,

    /// Reporter address as recorded by the primary backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

/// Where the photo for a new issue ended up.
///
/// A submission carries at most one of these, so an issue never has both
/// `image_url` and `image_base64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageAttachment {
    /// Uploaded to blob storage.
    Url(String),
    /// Upload failed; base64 JPEG carried inline.
    Inline(String),
}

/// Body of `POST /issues`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewIssue {
    pub building: String,
    pub description: String,
    pub image_url: Option<String>,
    pub image_base64: Option<String>,
}

impl NewIssue {
    /// Build a create payload from a validated report.
    #[must_use]
    pub fn new(building: String, description: String, attachment: Option<ImageAttachment>) -> Self {
        let (image_url, image_base64) = match attachment {
            Some(ImageAttachment::Url(url)) => (Some(url), None),
            Some(ImageAttachment::Inline(data)) => (None, Some(data)),
            None => (None, None),
        };
        Self {
            building,
            description,
            image_url,
            image_base64,
        }
    }

    /// Stamp this payload's image fields onto the created issue.
    ///
    /// The backend does not echo `image_base64`, so the returned record is
    /// completed from what was sent.
    pub fn apply_image_fields(&self, issue: &mut Issue) {
        issue.image_url.clone_from(&self.image_url);
        issue.image_base64.clone_from(&self.image_base64);
    }
}

/// Result of `POST /analyze`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeResult {
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub priority: Priority,
}

/// Sort issues newest first by `created_at`.
///
/// Stable, so equal timestamps keep their incoming order.
pub fn sort_newest_first(issues: &mut [Issue]) {
    issues.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "id": "7c1e",
            "building": "Main Library",
            "description": "Broken elevator",
            "image_url": null,
            "category": "Maintenance",
            "priority": "HIGH",
            "status": "In Progress",
            "created_at": "2025-03-01T10:15:30.123456+00:00",
            "user_email": "user@campus.edu"
        })
    }

    #[test]
    fn test_issue_from_backend_json() {
        let issue: Issue = serde_json::from_value(sample_json()).unwrap();
        assert_eq!(issue.priority, Priority::High);
        assert_eq!(issue.status, IssueStatus::InProgress);
        assert!(issue.image_url.is_none());
        assert!(issue.image_base64.is_none());
        assert_eq!(issue.user_email.as_deref(), Some("user@campus.edu"));
    }

    #[test]
    fn test_priority_defaults_to_medium() {
        let mut json = sample_json();
        json["priority"] = serde_json::json!("urgent-ish");
        let issue: Issue = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(issue.priority, Priority::Medium);

        json.as_object_mut().unwrap().remove("priority");
        let issue: Issue = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(issue.priority, Priority::Medium);

        json["priority"] = serde_json::Value::Null;
        let issue: Issue = serde_json::from_value(json).unwrap();
        assert_eq!(issue.priority, Priority::Medium);
    }

    #[test]
    fn test_missing_category_is_other() {
        let mut json = sample_json();
        json.as_object_mut().unwrap().remove("category");
        let issue: Issue = serde_json::from_value(json).unwrap();
        assert_eq!(issue.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_status_serializes_with_space() {
        let value = serde_json::to_value(IssueStatus::InProgress).unwrap();
        assert_eq!(value, "In Progress");
    }

    #[test]
    fn test_unknown_status_rejected() {
        let mut json = sample_json();
        json["status"] = serde_json::json!("Archived");
        assert!(serde_json::from_value::<Issue>(json).is_err());
    }

    #[test]
    fn test_new_issue_carries_one_image_field() {
        let url = NewIssue::new(
            "Cafeteria".into(),
            "Leak".into(),
            Some(ImageAttachment::Url("https://x/y.jpg".into())),
        );
        assert!(url.image_url.is_some() && url.image_base64.is_none());

        let inline = NewIssue::new(
            "Cafeteria".into(),
            "Leak".into(),
            Some(ImageAttachment::Inline("AAAA".into())),
        );
        assert!(inline.image_url.is_none() && inline.image_base64.is_some());

        let json = serde_json::to_value(NewIssue::new("Cafeteria".into(), "Leak".into(), None)).unwrap();
        assert!(json["image_url"].is_null());
        assert!(json["image_base64"].is_null());
    }

    #[test]
    fn test_sort_newest_first() {
        let mut a: Issue = serde_json::from_value(sample_json()).unwrap();
        let mut b = a.clone();
        a.id = "old".into();
        b.id = "new".into();
        b.created_at = a.created_at + chrono::Duration::seconds(5);

        let mut issues = vec![a, b];
        sort_newest_first(&mut issues);
        assert_eq!(issues[0].id, "new");
        assert_eq!(issues[1].id, "old");
    }
}
