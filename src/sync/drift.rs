//! Mirror drift telemetry.
//!
//! Secondary writes are best effort: their failures never reach the caller.
//! Each outcome is recorded here instead, so operators can see how far the
//! mirror has fallen behind.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Maximum number of events retained.
pub const DRIFT_LOG_CAPACITY: usize = 256;

/// What happened to a mirror write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorEventKind {
    Created,
    StatusMirrored,
    CreateFailed,
    StatusFailed,
    Repaired,
    RepairFailed,
}

impl MirrorEventKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::StatusMirrored => "status_mirrored",
            Self::CreateFailed => "create_failed",
            Self::StatusFailed => "status_failed",
            Self::Repaired => "repaired",
            Self::RepairFailed => "repair_failed",
        }
    }

    /// Whether this event leaves the mirror out of step with the primary.
    #[must_use]
    pub const fn is_drift(&self) -> bool {
        matches!(self, Self::CreateFailed | Self::StatusFailed | Self::RepairFailed)
    }
}

/// One recorded mirror outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorEvent {
    pub kind: MirrorEventKind,
    pub issue_id: String,
    /// Error text for failures.
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    events: VecDeque<MirrorEvent>,
    drift_count: u64,
}

/// Bounded, shareable log of mirror outcomes. Clones share one log.
#[derive(Debug, Clone, Default)]
pub struct DriftLog {
    inner: Arc<Mutex<Inner>>,
}

impl DriftLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the ring inconsistent.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, kind: MirrorEventKind, issue_id: &str, detail: Option<String>) {
        let mut inner = self.lock();
        if kind.is_drift() {
            inner.drift_count += 1;
        }
        if inner.events.len() == DRIFT_LOG_CAPACITY {
            inner.events.pop_front();
        }
        inner.events.push_back(MirrorEvent {
            kind,
            issue_id: issue_id.to_string(),
            detail,
            at: Utc::now(),
        });
    }

    /// Total drift-causing events since creation, including evicted ones.
    #[must_use]
    pub fn drift_count(&self) -> u64 {
        self.lock().drift_count
    }

    /// Snapshot of retained events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<MirrorEvent> {
        self.lock().events.iter().cloned().collect()
    }

    /// Retained drift-causing events, oldest first.
    #[must_use]
    pub fn failures(&self) -> Vec<MirrorEvent> {
        self.lock()
            .events
            .iter()
            .filter(|e| e.kind.is_drift())
            .cloned()
            .collect()
    }
}
