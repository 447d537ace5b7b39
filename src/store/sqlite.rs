//! Local SQLite mirror.
//!
//! Stands in for Firestore when no Firebase project is configured. One row
//! per issue keyed by the primary id; timestamps are stored as RFC 3339 UTC
//! text with a fixed width, so `ORDER BY created_at` is chronological.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Issue, IssueStatus, Priority};

use super::SecondaryStore;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS issues (
    id TEXT PRIMARY KEY,
    building TEXT NOT NULL,
    description TEXT NOT NULL,
    image_url TEXT,
    category TEXT NOT NULL,
    priority TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    user_email TEXT,
    mirrored_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_issues_created_at ON issues(created_at DESC);
";

const SELECT_COLUMNS: &str =
    "id, building, description, image_url, category, priority, status, created_at, user_email";

/// SQLite-backed secondary store.
#[derive(Debug)]
pub struct SqliteMirrorStore {
    conn: Mutex<Connection>,
}

impl SqliteMirrorStore {
    /// Open (or create) a mirror database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Secondary("SQLite mirror lock poisoned".into()))
    }

    fn upsert(&self, issue: &Issue) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO issues
                 (id, building, description, image_url, category, priority, status,
                  created_at, user_email, mirrored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                 building = excluded.building,
                 description = excluded.description,
                 image_url = excluded.image_url,
                 category = excluded.category,
                 priority = excluded.priority,
                 status = excluded.status,
                 created_at = excluded.created_at,
                 user_email = excluded.user_email,
                 mirrored_at = excluded.mirrored_at",
            params![
                issue.id,
                issue.building,
                issue.description,
                issue.image_url,
                issue.category,
                issue.priority.as_str(),
                issue.status.as_str(),
                format_timestamp(issue.created_at),
                issue.user_email,
                format_timestamp(Utc::now()),
            ],
        )?;
        Ok(())
    }

    fn set_status(&self, id: &str, status: IssueStatus) -> Result<()> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE issues SET status = ?1, mirrored_at = ?2 WHERE id = ?3",
            params![status.as_str(), format_timestamp(Utc::now()), id],
        )?;
        if rows == 0 {
            return Err(Error::IssueNotFound { id: id.to_string() });
        }
        Ok(())
    }

    fn all_issues(&self) -> Result<Vec<Issue>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM issues ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map([], map_issue_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn text_conversion_error(idx: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn map_issue_row(row: &rusqlite::Row) -> rusqlite::Result<Issue> {
    let priority: String = row.get(5)?;
    let status: String = row.get(6)?;
    let created_at: String = row.get(7)?;

    Ok(Issue {
        id: row.get(0)?,
        building: row.get(1)?,
        description: row.get(2)?,
        image_url: row.get(3)?,
        image_base64: None,
        category: row.get(4)?,
        priority: Priority::from_label(&priority),
        status: status.parse().map_err(|e| text_conversion_error(6, e))?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| text_conversion_error(7, e))?
            .with_timezone(&Utc),
        user_email: row.get(8)?,
    })
}

impl SecondaryStore for SqliteMirrorStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn mirror_issue(&self, issue: &Issue) -> Result<()> {
        self.upsert(issue)?;
        debug!(issue_id = %issue.id, "Issue mirrored to SQLite");
        Ok(())
    }

    async fn update_status(&self, id: &str, status: IssueStatus) -> Result<()> {
        self.set_status(id, status)
    }

    async fn list_issues(&self) -> Result<Vec<Issue>> {
        self.all_issues()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn issue(id: &str, minute: u32) -> Issue {
        Issue {
            id: id.into(),
            building: "Main Library".into(),
            description: format!("issue {id}"),
            image_url: None,
            image_base64: Some("inline".into()),
            category: "Facilities".into(),
            priority: Priority::Low,
            status: IssueStatus::Open,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, minute, 0).unwrap(),
            user_email: None,
        }
    }

    #[tokio::test]
    async fn test_mirror_and_list_newest_first() {
        let store = SqliteMirrorStore::open_memory().unwrap();
        store.mirror_issue(&issue("a", 1)).await.unwrap();
        store.mirror_issue(&issue("c", 3)).await.unwrap();
        store.mirror_issue(&issue("b", 2)).await.unwrap();

        let listed = store.list_issues().await.unwrap();
        let ids: Vec<_> = listed.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["c", "b", "a"]);
        assert!(listed.iter().all(|i| i.image_base64.is_none()));
    }

    #[tokio::test]
    async fn test_mirror_is_upsert() {
        let store = SqliteMirrorStore::open_memory().unwrap();
        let mut first = issue("a", 1);
        store.mirror_issue(&first).await.unwrap();

        first.description = "updated".into();
        first.priority = Priority::High;
        store.mirror_issue(&first).await.unwrap();

        let listed = store.list_issues().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].description, "updated");
        assert_eq!(listed[0].priority, Priority::High);
    }

    #[tokio::test]
    async fn test_update_status_existing() {
        let store = SqliteMirrorStore::open_memory().unwrap();
        store.mirror_issue(&issue("a", 1)).await.unwrap();
        store.update_status("a", IssueStatus::InProgress).await.unwrap();

        let listed = store.list_issues().await.unwrap();
        assert_eq!(listed[0].status, IssueStatus::InProgress);
    }

    #[tokio::test]
    async fn test_update_status_missing_does_not_create() {
        let store = SqliteMirrorStore::open_memory().unwrap();
        let err = store
            .update_status("ghost", IssueStatus::Resolved)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IssueNotFound { .. }));
        assert!(store.list_issues().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mirror.db");
        {
            let store = SqliteMirrorStore::open(&path).unwrap();
            store.mirror_issue(&issue("a", 1)).await.unwrap();
        }
        let reopened = SqliteMirrorStore::open(&path).unwrap();
        assert_eq!(reopened.list_issues().await.unwrap().len(), 1);
    }

    #[test]
    fn test_timestamp_format_is_fixed_width() {
        let a = format_timestamp(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(a, "2025-01-01T00:00:00.000000Z");
    }
}
