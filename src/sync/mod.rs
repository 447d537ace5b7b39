//! Dual-write replication between the primary store and its mirror.
//!
//! - **Synchronizer**: primary-first writes with best-effort mirroring
//! - **Drift**: bounded log of mirror outcomes for operators
//! - **Hashing**: SHA256 fingerprints of replicated fields
//! - **Audit**: primary vs mirror comparison and operator-triggered repair
//!
//! # Example
//!
//! ```ignore
//! use campus::sync::Synchronizer;
//!
//! let sync = Synchronizer::new(primary, mirror, blobs);
//! let issue = sync.submit("Main Library", "Broken elevator", None).await?;
//! sync.set_status(&issue.id, IssueStatus::InProgress).await?;
//!
//! if sync.drift_log().drift_count() > 0 {
//!     let stats = sync.repair_mirror().await?;
//! }
//! ```

pub mod audit;
pub mod drift;
pub mod hash;
mod synchronizer;

pub use audit::{compare, DriftReport};
pub use drift::{DriftLog, MirrorEvent, MirrorEventKind, DRIFT_LOG_CAPACITY};
pub use hash::{content_hash, has_changed};
pub use synchronizer::{RepairStats, Synchronizer};
