//! Input validation for issue reports and status changes.
//!
//! Everything here runs before any I/O. Resolution is three-tier:
//! exact (case-insensitive) match → synonym lookup → error with suggestion.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::model::IssueStatus;

// ── Valid values ─────────────────────────────────────────────

/// Campus locations an issue can be filed against.
pub const BUILDINGS: [&str; 10] = [
    "Main Library",
    "Science Building",
    "Student Center",
    "Engineering Hall",
    "Arts Building",
    "Administration Building",
    "Sports Complex",
    "Dormitory A",
    "Dormitory B",
    "Cafeteria",
];

// ── Synonym maps ─────────────────────────────────────────────

pub static STATUS_SYNONYMS: LazyLock<HashMap<&str, IssueStatus>> = LazyLock::new(|| {
    [
        ("open", IssueStatus::Open),
        ("new", IssueStatus::Open),
        ("todo", IssueStatus::Open),
        ("reopen", IssueStatus::Open),
        ("reopened", IssueStatus::Open),
        ("in progress", IssueStatus::InProgress),
        ("in_progress", IssueStatus::InProgress),
        ("in-progress", IssueStatus::InProgress),
        ("inprogress", IssueStatus::InProgress),
        ("wip", IssueStatus::InProgress),
        ("working", IssueStatus::InProgress),
        ("started", IssueStatus::InProgress),
        ("resolved", IssueStatus::Resolved),
        ("done", IssueStatus::Resolved),
        ("closed", IssueStatus::Resolved),
        ("fixed", IssueStatus::Resolved),
        ("complete", IssueStatus::Resolved),
        ("completed", IssueStatus::Resolved),
    ]
    .into_iter()
    .collect()
});

/// Normalize a status label via exact match or synonym lookup.
///
/// # Errors
///
/// Returns `InvalidStatus` with the closest known label as a suggestion.
pub fn normalize_status(input: &str) -> Result<IssueStatus> {
    let lower = input.trim().to_lowercase();

    if let Some(&status) = STATUS_SYNONYMS.get(lower.as_str()) {
        return Ok(status);
    }

    let suggestion = find_closest_match(&lower, STATUS_SYNONYMS.keys().copied())
        .and_then(|key| STATUS_SYNONYMS.get(key))
        .map(|s| s.as_str().to_string());

    Err(Error::InvalidStatus {
        value: input.to_string(),
        suggestion,
    })
}

/// Normalize a building name to its canonical spelling.
///
/// # Errors
///
/// Returns `RequiredField` for blank input and `InvalidBuilding` (with a
/// suggestion when one is close) for anything not in [`BUILDINGS`].
pub fn normalize_building(input: &str) -> Result<&'static str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::RequiredField { field: "building" });
    }

    let lower = trimmed.to_lowercase();
    if let Some(&canonical) = BUILDINGS.iter().find(|b| b.to_lowercase() == lower) {
        return Ok(canonical);
    }

    let lowered: Vec<(String, &'static str)> =
        BUILDINGS.iter().map(|b| (b.to_lowercase(), *b)).collect();
    let suggestion = find_closest_match(&lower, lowered.iter().map(|(l, _)| l.as_str()))
        .and_then(|hit| lowered.iter().find(|(l, _)| l == hit))
        .map(|(_, canonical)| (*canonical).to_string());

    Err(Error::InvalidBuilding {
        value: trimmed.to_string(),
        suggestion,
    })
}

/// A report that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidReport {
    pub building: &'static str,
    pub description: String,
}

/// Validate the form fields of a new report.
///
/// # Errors
///
/// Returns `RequiredField` or `InvalidBuilding`; never touches a store.
pub fn validate_report(building: &str, description: &str) -> Result<ValidReport> {
    let building = normalize_building(building)?;
    let description = description.trim();
    if description.is_empty() {
        return Err(Error::RequiredField {
            field: "description",
        });
    }
    Ok(ValidReport {
        building,
        description: description.to_string(),
    })
}

/// Find the closest candidate within edit distance 3.
fn find_closest_match<'a>(input: &str, candidates: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut best: Option<(&str, usize)> = None;

    for candidate in candidates {
        let dist = levenshtein_distance(input, candidate);
        if dist <= 3 && best.is_none_or(|(_, d)| dist < d) {
            best = Some((candidate, dist));
        }
    }

    best.map(|(v, _)| v)
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_status() {
        assert_eq!(normalize_status("Open").unwrap(), IssueStatus::Open);
        assert_eq!(normalize_status("IN PROGRESS").unwrap(), IssueStatus::InProgress);
        assert_eq!(normalize_status("in_progress").unwrap(), IssueStatus::InProgress);
        assert_eq!(normalize_status("done").unwrap(), IssueStatus::Resolved);
        assert_eq!(normalize_status(" resolved ").unwrap(), IssueStatus::Resolved);
    }

    #[test]
    fn test_normalize_status_suggests() {
        match normalize_status("resolvd") {
            Err(Error::InvalidStatus { suggestion, .. }) => {
                assert_eq!(suggestion.as_deref(), Some("Resolved"));
            }
            other => panic!("expected InvalidStatus, got {other:?}"),
        }
        assert!(normalize_status("nonsense-value").is_err());
    }

    #[test]
    fn test_normalize_building() {
        assert_eq!(normalize_building("main library").unwrap(), "Main Library");
        assert_eq!(normalize_building("  Cafeteria ").unwrap(), "Cafeteria");

        match normalize_building("Dormitory C") {
            Err(Error::InvalidBuilding { suggestion, .. }) => {
                assert!(suggestion.is_some_and(|s| s.starts_with("Dormitory")));
            }
            other => panic!("expected InvalidBuilding, got {other:?}"),
        }

        assert!(matches!(
            normalize_building("   "),
            Err(Error::RequiredField { field: "building" })
        ));
    }

    #[test]
    fn test_validate_report() {
        let report = validate_report("Main Library", "  Broken elevator ").unwrap();
        assert_eq!(report.building, "Main Library");
        assert_eq!(report.description, "Broken elevator");

        assert!(matches!(
            validate_report("Main Library", ""),
            Err(Error::RequiredField {
                field: "description"
            })
        ));
        assert!(matches!(
            validate_report("", "Leak"),
            Err(Error::RequiredField { field: "building" })
        ));
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", "abc"), 0);
        assert_eq!(levenshtein_distance("abc", "abd"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }
}
