//! Compare primary and mirror contents.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::model::Issue;

use super::hash::{content_hash, has_changed};

/// Differences between the primary store and its mirror.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DriftReport {
    /// Primary ids with no mirror document.
    pub missing_in_secondary: Vec<String>,
    /// Mirror ids the primary does not know.
    pub orphaned_in_secondary: Vec<String>,
    /// Ids present in both whose replicated fields differ.
    pub diverged: Vec<String>,
    pub in_sync: usize,
}

impl DriftReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missing_in_secondary.is_empty()
            && self.orphaned_in_secondary.is_empty()
            && self.diverged.is_empty()
    }

    /// Ids a repair pass should re-mirror, in primary order.
    #[must_use]
    pub fn needs_repair(&self) -> impl Iterator<Item = &str> {
        self.missing_in_secondary
            .iter()
            .chain(&self.diverged)
            .map(String::as_str)
    }
}

/// Diff two issue lists by id and content hash.
///
/// Output ids follow the order of the list they come from.
#[must_use]
pub fn compare(primary: &[Issue], secondary: &[Issue]) -> DriftReport {
    let mirrored: HashMap<&str, String> = secondary
        .iter()
        .map(|i| (i.id.as_str(), content_hash(i)))
        .collect();

    let mut report = DriftReport::default();
    for issue in primary {
        match mirrored.get(issue.id.as_str()) {
            None => report.missing_in_secondary.push(issue.id.clone()),
            Some(stored) if has_changed(&content_hash(issue), Some(stored)) => {
                report.diverged.push(issue.id.clone());
            }
            Some(_) => report.in_sync += 1,
        }
    }

    let known: HashSet<&str> = primary.iter().map(|i| i.id.as_str()).collect();
    report.orphaned_in_secondary = secondary
        .iter()
        .filter(|i| !known.contains(i.id.as_str()))
        .map(|i| i.id.clone())
        .collect();

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IssueStatus;
    use crate::store::testing::sample_issue;

    #[test]
    fn test_identical_lists_are_clean() {
        let issues = vec![sample_issue("a", 1), sample_issue("b", 2)];
        let report = compare(&issues, &issues);
        assert!(report.is_clean());
        assert_eq!(report.in_sync, 2);
    }

    #[test]
    fn test_detects_each_kind_of_drift() {
        let primary = vec![sample_issue("a", 1), sample_issue("b", 2), sample_issue("c", 3)];
        let mut stale = sample_issue("b", 2);
        stale.status = IssueStatus::Resolved;
        let secondary = vec![sample_issue("a", 1), stale, sample_issue("z", 9)];

        let report = compare(&primary, &secondary);
        assert_eq!(report.missing_in_secondary, ["c"]);
        assert_eq!(report.diverged, ["b"]);
        assert_eq!(report.orphaned_in_secondary, ["z"]);
        assert_eq!(report.in_sync, 1);
        assert!(!report.is_clean());
        assert_eq!(report.needs_repair().collect::<Vec<_>>(), ["c", "b"]);
    }

    #[test]
    fn test_empty_mirror_is_all_missing() {
        let primary = vec![sample_issue("a", 1)];
        let report = compare(&primary, &[]);
        assert_eq!(report.missing_in_secondary, ["a"]);
        assert_eq!(report.in_sync, 0);
    }
}
