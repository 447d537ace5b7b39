//! Data models for the campus reporter.
//!
//! This module contains the domain models:
//! - Issue (with status, priority and create payload)
//! - StatsSummary

pub mod issue;
pub mod stats;

pub use issue::{
    sort_newest_first, AnalyzeResult, ImageAttachment, Issue, IssueStatus, NewIssue, Priority,
    DEFAULT_CATEGORY,
};
pub use stats::{StatsSummary, FALLBACK_SYSTEM_STATUS};
