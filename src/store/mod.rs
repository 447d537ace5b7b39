//! Persistence backends.
//!
//! Three independent collaborators sit behind traits:
//! - **Primary** ([`PrimaryStore`]) - authoritative REST API; assigns ids,
//!   category, priority and timestamps
//! - **Secondary** ([`SecondaryStore`]) - best-effort document mirror keyed
//!   by the primary id, read only as a fallback
//! - **Blob** ([`BlobStore`]) - key-addressed photo storage returning a URL
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ Synchronizer / Reconciler    │
//! └──────┬──────────┬──────────┬─┘
//!        │          │          │
//!        ▼          ▼          ▼
//! ┌──────────┐ ┌──────────┐ ┌────────────┐
//! │ Primary  │ │ Mirror   │ │ Blob       │
//! │ REST API │ │ Firestore│ │ Firebase   │
//! └──────────┘ │ / SQLite │ │ Storage    │
//!              └──────────┘ └────────────┘
//! ```
//!
//! The traits use `impl Future` returns so implementations can be plain
//! `async fn`s; callers are generic over them.

pub mod blob;
pub mod firestore;
pub mod primary;
pub mod sqlite;

#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;

use crate::config::{MirrorKind, Settings};
use crate::error::Result;
use crate::model::{AnalyzeResult, Issue, IssueStatus, NewIssue, StatsSummary};

pub use blob::FirebaseBlobStore;
pub use firestore::FirestoreStore;
pub use primary::RestPrimaryStore;
pub use sqlite::SqliteMirrorStore;

/// The authoritative issue repository.
pub trait PrimaryStore: Send + Sync {
    /// Fetch every issue, in whatever order the server returns.
    fn list_issues(&self) -> impl Future<Output = Result<Vec<Issue>>> + Send;

    /// Create an issue; the server categorizes it and assigns id/status/time.
    fn create_issue(&self, issue: &NewIssue) -> impl Future<Output = Result<Issue>> + Send;

    /// Overwrite the status of an issue (last write wins).
    fn update_status(&self, id: &str, status: IssueStatus) -> impl Future<Output = Result<()>> + Send;

    /// Aggregate counts for the dashboard.
    fn stats(&self) -> impl Future<Output = Result<StatsSummary>> + Send;

    /// Ask the categorization backend for a category/priority preview.
    fn analyze(
        &self,
        description: &str,
        image_base64: Option<&str>,
    ) -> impl Future<Output = Result<AnalyzeResult>> + Send;
}

/// The best-effort mirror of the primary store.
pub trait SecondaryStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Upsert `issue` under its primary id.
    fn mirror_issue(&self, issue: &Issue) -> impl Future<Output = Result<()>> + Send;

    /// Set the status of an already-mirrored issue.
    ///
    /// Fails with `IssueNotFound` rather than creating a partial record.
    fn update_status(&self, id: &str, status: IssueStatus) -> impl Future<Output = Result<()>> + Send;

    /// Every mirrored issue, newest `created_at` first.
    fn list_issues(&self) -> impl Future<Output = Result<Vec<Issue>>> + Send;
}

/// Key-addressed binary storage for photos.
pub trait BlobStore: Send + Sync {
    /// Upload `bytes` under `key` and return a retrievable URL.
    fn upload(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Secondary backend chosen at runtime from configuration.
#[derive(Debug)]
pub enum MirrorBackend {
    Firestore(FirestoreStore),
    Sqlite(SqliteMirrorStore),
}

impl MirrorBackend {
    /// Build the configured mirror.
    ///
    /// # Errors
    ///
    /// Returns an error if the Firestore endpoint is invalid or the SQLite
    /// file cannot be opened.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        match settings.mirror {
            MirrorKind::Firestore => FirestoreStore::from_settings(settings).map(Self::Firestore),
            MirrorKind::Sqlite => {
                if let Some(parent) = settings.mirror_db.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                SqliteMirrorStore::open(&settings.mirror_db).map(Self::Sqlite)
            }
        }
    }
}

impl SecondaryStore for MirrorBackend {
    fn name(&self) -> &'static str {
        match self {
            Self::Firestore(s) => s.name(),
            Self::Sqlite(s) => s.name(),
        }
    }

    async fn mirror_issue(&self, issue: &Issue) -> Result<()> {
        match self {
            Self::Firestore(s) => s.mirror_issue(issue).await,
            Self::Sqlite(s) => s.mirror_issue(issue).await,
        }
    }

    async fn update_status(&self, id: &str, status: IssueStatus) -> Result<()> {
        match self {
            Self::Firestore(s) => s.update_status(id, status).await,
            Self::Sqlite(s) => s.update_status(id, status).await,
        }
    }

    async fn list_issues(&self) -> Result<Vec<Issue>> {
        match self {
            Self::Firestore(s) => s.list_issues().await,
            Self::Sqlite(s) => s.list_issues().await,
        }
    }
}
