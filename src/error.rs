//! Error types for the campus issue reporter core.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Retryability flags so a controller knows whether to offer "try again"
//! - Context-aware recovery hints
//! - Structured JSON output for view-layer consumers
//!
//! Fatal store failures never reach the view layer raw: the synchronizer wraps
//! them in [`Error::SubmissionFailed`] or [`Error::UpdateFailed`], whose
//! display text is generic while [`std::error::Error::source`] keeps the
//! operator detail.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes.
///
/// Each code maps to a SCREAMING_SNAKE string the controller can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation
    RequiredField,
    InvalidBuilding,
    InvalidStatus,
    InvalidArgument,

    // Image pipeline
    ImageDecodeFailed,
    ImageEncodeFailed,
    UploadFailed,

    // Stores
    PrimaryUnavailable,
    SecondaryUnavailable,
    Timeout,
    IssueNotFound,
    DatabaseError,

    // User-facing
    SubmissionFailed,
    UpdateFailed,

    // Ambient
    ConfigError,
    IoError,
    JsonError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::RequiredField => "REQUIRED_FIELD",
            Self::InvalidBuilding => "INVALID_BUILDING",
            Self::InvalidStatus => "INVALID_STATUS",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::ImageDecodeFailed => "IMAGE_DECODE_FAILED",
            Self::ImageEncodeFailed => "IMAGE_ENCODE_FAILED",
            Self::UploadFailed => "UPLOAD_FAILED",
            Self::PrimaryUnavailable => "PRIMARY_UNAVAILABLE",
            Self::SecondaryUnavailable => "SECONDARY_UNAVAILABLE",
            Self::Timeout => "TIMEOUT",
            Self::IssueNotFound => "ISSUE_NOT_FOUND",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::SubmissionFailed => "SUBMISSION_FAILED",
            Self::UpdateFailed => "UPDATE_FAILED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
        }
    }

    /// Whether retrying the same call may succeed.
    ///
    /// True for transient I/O against the stores and for the user-facing
    /// wrappers (which only ever wrap store failures). False for validation
    /// and decode errors, which need corrected input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PrimaryUnavailable
                | Self::SecondaryUnavailable
                | Self::Timeout
                | Self::UploadFailed
                | Self::DatabaseError
                | Self::SubmissionFailed
                | Self::UpdateFailed
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing required field: {field}")]
    RequiredField { field: &'static str },

    #[error("Unknown building: {value}")]
    InvalidBuilding {
        value: String,
        suggestion: Option<String>,
    },

    #[error("Invalid status: {value}")]
    InvalidStatus {
        value: String,
        suggestion: Option<String>,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Could not decode image: {0}")]
    ImageDecode(String),

    #[error("Could not encode image: {0}")]
    ImageEncode(String),

    #[error("Image upload failed: {0}")]
    Upload(String),

    #[error("Primary store error: {0}")]
    Primary(String),

    #[error("Secondary store error: {0}")]
    Secondary(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: &'static str, seconds: u64 },

    #[error("Issue not found: {id}")]
    IssueNotFound { id: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to submit report")]
    SubmissionFailed {
        #[source]
        source: Box<Error>,
    },

    #[error("Failed to update issue status")]
    UpdateFailed {
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap a fatal create-path failure in the user-facing category.
    #[must_use]
    pub fn submission_failed(source: Self) -> Self {
        Self::SubmissionFailed {
            source: Box::new(source),
        }
    }

    /// Wrap a fatal status-patch failure in the user-facing category.
    #[must_use]
    pub fn update_failed(source: Self) -> Self {
        Self::UpdateFailed {
            source: Box::new(source),
        }
    }

    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::RequiredField { .. } => ErrorCode::RequiredField,
            Self::InvalidBuilding { .. } => ErrorCode::InvalidBuilding,
            Self::InvalidStatus { .. } => ErrorCode::InvalidStatus,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::ImageDecode(_) => ErrorCode::ImageDecodeFailed,
            Self::ImageEncode(_) => ErrorCode::ImageEncodeFailed,
            Self::Upload(_) => ErrorCode::UploadFailed,
            Self::Primary(_) => ErrorCode::PrimaryUnavailable,
            Self::Secondary(_) => ErrorCode::SecondaryUnavailable,
            Self::Timeout { .. } => ErrorCode::Timeout,
            Self::IssueNotFound { .. } => ErrorCode::IssueNotFound,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::SubmissionFailed { .. } => ErrorCode::SubmissionFailed,
            Self::UpdateFailed { .. } => ErrorCode::UpdateFailed,
        }
    }

    /// Context-aware recovery hint for the person in front of the form.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::RequiredField { .. } => Some("Please fill in all required fields".to_string()),

            Self::InvalidBuilding { suggestion, .. } => Some(match suggestion {
                Some(s) => format!("Did you mean: {s}?"),
                None => format!(
                    "Valid buildings: {}",
                    crate::validate::BUILDINGS.join(", ")
                ),
            }),

            Self::InvalidStatus { suggestion, .. } => Some(match suggestion {
                Some(s) => format!("Did you mean: {s}?"),
                None => "Valid statuses: Open, In Progress, Resolved".to_string(),
            }),

            Self::ImageDecode(_) => {
                Some("The selected file is not a readable image. Choose a JPEG, PNG, GIF, WebP or BMP file.".to_string())
            }

            Self::SubmissionFailed { .. } => {
                Some("Failed to submit report. Please try again.".to_string())
            }

            Self::UpdateFailed { .. } => {
                Some("The status was not changed. Please try again.".to_string())
            }

            Self::IssueNotFound { id } => Some(format!(
                "No issue with ID '{id}'. Refresh the issue list and try again."
            )),

            Self::InvalidArgument(_)
            | Self::ImageEncode(_)
            | Self::Upload(_)
            | Self::Primary(_)
            | Self::Secondary(_)
            | Self::Timeout { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Config(_) => None,
        }
    }

    /// Structured JSON representation for the view layer.
    ///
    /// Includes error code, message, retryability and optional hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_submission_failed_hides_backend_detail() {
        let err = Error::submission_failed(Error::Primary("connection refused".into()));
        assert_eq!(err.to_string(), "Failed to submit report");
        assert_eq!(err.error_code(), ErrorCode::SubmissionFailed);

        let source = err.source().expect("source should be kept");
        assert!(source.to_string().contains("connection refused"));
    }

    #[test]
    fn test_retryability() {
        assert!(ErrorCode::Timeout.is_retryable());
        assert!(ErrorCode::UpdateFailed.is_retryable());
        assert!(!ErrorCode::RequiredField.is_retryable());
        assert!(!ErrorCode::ImageDecodeFailed.is_retryable());
    }

    #[test]
    fn test_structured_json() {
        let err = Error::InvalidStatus {
            value: "Closed?".into(),
            suggestion: Some("Resolved".into()),
        };
        let json = err.to_structured_json();
        assert_eq!(json["error"]["code"], "INVALID_STATUS");
        assert_eq!(json["error"]["retryable"], false);
        assert_eq!(json["error"]["hint"], "Did you mean: Resolved?");
    }

    #[test]
    fn test_building_hint_lists_buildings() {
        let err = Error::InvalidBuilding {
            value: "Moon Base".into(),
            suggestion: None,
        };
        let hint = err.hint().unwrap();
        assert!(hint.contains("Main Library"));
        assert!(hint.contains("Cafeteria"));
    }
}
