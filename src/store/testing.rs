//! In-memory stores for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{Error, Result};
use crate::model::{
    sort_newest_first, AnalyzeResult, Issue, IssueStatus, NewIssue, Priority, StatsSummary,
};

use super::{BlobStore, PrimaryStore, SecondaryStore};

/// Deterministic timestamp `minutes` after a fixed epoch.
pub fn at_minute(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
}

pub fn sample_issue(id: &str, minutes: i64) -> Issue {
    Issue {
        id: id.to_string(),
        building: "Main Library".into(),
        description: format!("issue {id}"),
        image_url: None,
        image_base64: None,
        category: "Facilities".into(),
        priority: Priority::Medium,
        status: IssueStatus::Open,
        created_at: at_minute(minutes),
        user_email: None,
    }
}

#[derive(Default)]
pub struct FakePrimary {
    pub issues: Mutex<Vec<Issue>>,
    pub created: Mutex<Vec<NewIssue>>,
    pub status_updates: Mutex<Vec<(String, IssueStatus)>>,
    pub stats: Mutex<Option<StatsSummary>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub create_delay: Option<Duration>,
    pub next_id: AtomicUsize,
}

impl FakePrimary {
    pub fn with_issues(issues: Vec<Issue>) -> Self {
        Self {
            issues: Mutex::new(issues),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        let primary = Self::default();
        primary.fail_reads.store(true, Ordering::SeqCst);
        primary.fail_writes.store(true, Ordering::SeqCst);
        primary
    }

    pub fn created(&self) -> Vec<NewIssue> {
        self.created.lock().unwrap().clone()
    }

    pub fn status_of(&self, id: &str) -> Option<IssueStatus> {
        self.issues
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == id)
            .map(|i| i.status)
    }
}

impl PrimaryStore for FakePrimary {
    async fn list_issues(&self) -> Result<Vec<Issue>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Primary("list issues: connection refused".into()));
        }
        Ok(self.issues.lock().unwrap().clone())
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<Issue> {
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Primary("create issue failed (500): boom".into()));
        }

        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let created = Issue {
            id: format!("srv-{n}"),
            building: issue.building.clone(),
            description: issue.description.clone(),
            image_url: issue.image_url.clone(),
            image_base64: issue.image_base64.clone(),
            category: "Plumbing".into(),
            priority: Priority::High,
            status: IssueStatus::Open,
            created_at: at_minute(100),
            user_email: None,
        };
        self.created.lock().unwrap().push(issue.clone());
        self.issues.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_status(&self, id: &str, status: IssueStatus) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Primary("update status failed (500): boom".into()));
        }
        let mut issues = self.issues.lock().unwrap();
        let issue = issues
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| Error::IssueNotFound { id: id.to_string() })?;
        issue.status = status;
        self.status_updates
            .lock()
            .unwrap()
            .push((id.to_string(), status));
        Ok(())
    }

    async fn stats(&self) -> Result<StatsSummary> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Primary("fetch stats: connection refused".into()));
        }
        let stored = self.stats.lock().unwrap().clone();
        Ok(stored.unwrap_or_else(|| StatsSummary::from_issues(&self.issues.lock().unwrap())))
    }

    async fn analyze(&self, _description: &str, _image_base64: Option<&str>) -> Result<AnalyzeResult> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Primary("analyze: connection refused".into()));
        }
        Ok(AnalyzeResult {
            category: "Plumbing".into(),
            priority: Priority::High,
        })
    }
}

#[derive(Default)]
pub struct FakeSecondary {
    pub issues: Mutex<Vec<Issue>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub writes: AtomicUsize,
}

impl FakeSecondary {
    pub fn with_issues(issues: Vec<Issue>) -> Self {
        Self {
            issues: Mutex::new(issues),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        let secondary = Self::default();
        secondary.fail_reads.store(true, Ordering::SeqCst);
        secondary.fail_writes.store(true, Ordering::SeqCst);
        secondary
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn get(&self, id: &str) -> Option<Issue> {
        self.issues.lock().unwrap().iter().find(|i| i.id == id).cloned()
    }
}

impl SecondaryStore for FakeSecondary {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn mirror_issue(&self, issue: &Issue) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Secondary("permission denied".into()));
        }
        let mut issues = self.issues.lock().unwrap();
        issues.retain(|i| i.id != issue.id);
        issues.push(issue.clone());
        Ok(())
    }

    async fn update_status(&self, id: &str, status: IssueStatus) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Secondary("permission denied".into()));
        }
        let mut issues = self.issues.lock().unwrap();
        let issue = issues
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| Error::IssueNotFound { id: id.to_string() })?;
        issue.status = status;
        Ok(())
    }

    async fn list_issues(&self) -> Result<Vec<Issue>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Secondary("unavailable".into()));
        }
        let mut issues = self.issues.lock().unwrap().clone();
        sort_newest_first(&mut issues);
        Ok(issues)
    }
}

#[derive(Default)]
pub struct FakeBlobs {
    pub fail: AtomicBool,
    pub uploads: Mutex<Vec<(String, usize, String)>>,
}

impl FakeBlobs {
    pub fn failing() -> Self {
        let blobs = Self::default();
        blobs.fail.store(true, Ordering::SeqCst);
        blobs
    }

    pub fn keys(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _, _)| key.clone())
            .collect()
    }
}

impl BlobStore for FakeBlobs {
    async fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Upload("bucket unreachable".into()));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((key.to_string(), bytes.len(), content_type.to_string()));
        Ok(format!("https://blobs.test/{key}"))
    }
}
