//! Aggregate issue statistics for the staff dashboard.

use serde::{Deserialize, Serialize};

use super::issue::{sort_newest_first, Issue, IssueStatus};

/// System status reported when stats are derived locally.
///
/// Placeholder only: no health check backs it.
pub const FALLBACK_SYSTEM_STATUS: &str = "Operational";

/// How many recent issues a derived summary keeps.
pub const RECENT_LOG_SAMPLE: usize = 5;

/// How many recent issues the dashboard shows.
pub const RECENT_LOG_DISPLAY: usize = 3;

/// Response of `GET /stats`, or the same shape derived from a held list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    #[serde(default)]
    pub total_issues: usize,
    #[serde(default)]
    pub open_issues: usize,
    #[serde(default)]
    pub in_progress: usize,
    #[serde(default)]
    pub resolved: usize,
    #[serde(default)]
    pub system_status: String,
    #[serde(default)]
    pub recent_logs: Vec<Issue>,
}

impl StatsSummary {
    /// Derive counts from an already-held issue list (no fetch).
    #[must_use]
    pub fn from_issues(issues: &[Issue]) -> Self {
        let count = |status: IssueStatus| issues.iter().filter(|i| i.status == status).count();

        let mut recent = issues.to_vec();
        sort_newest_first(&mut recent);
        recent.truncate(RECENT_LOG_SAMPLE);

        Self {
            total_issues: issues.len(),
            open_issues: count(IssueStatus::Open),
            in_progress: count(IssueStatus::InProgress),
            resolved: count(IssueStatus::Resolved),
            system_status: FALLBACK_SYSTEM_STATUS.to_string(),
            recent_logs: recent,
        }
    }

    /// The recent issues trimmed for display.
    #[must_use]
    pub fn display_logs(&self) -> &[Issue] {
        let end = self.recent_logs.len().min(RECENT_LOG_DISPLAY);
        &self.recent_logs[..end]
    }
}
