//! Campus issue reporter core.
//!
//! Reports (building, description, optional photo) are written to an
//! authoritative REST backend and mirrored best effort into a secondary
//! document store. Reads fail over to the mirror when the backend is down.
//!
//! # Architecture
//!
//! - [`imaging`] - Photo downsampling and JPEG re-encoding
//! - [`store`] - Primary, mirror and blob storage clients
//! - [`sync`] - Dual-write synchronizer and mirror drift telemetry
//! - [`reconcile`] - Primary-first reads with mirror failover
//! - [`board`] - View state container for UI controllers
//! - [`model`] - Data types (Issue, IssueStatus, StatsSummary)
//! - [`validate`] - Building and status normalization
//! - [`config`] - Configuration management
//! - [`error`] - Error types and handling
//!
//! # Example
//!
//! ```ignore
//! use campus::{board::DefaultBoard, config::Settings};
//!
//! campus::logging::init_tracing(1);
//! let mut board = DefaultBoard::from_settings(&Settings::resolve()?)?;
//! board.submit("Main Library", "Broken elevator", None).await?;
//! for issue in board.issues() {
//!     println!("{} [{}] {}", issue.building, issue.status, issue.description);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod board;
pub mod config;
pub mod error;
pub mod imaging;
pub mod logging;
pub mod model;
pub mod reconcile;
pub mod store;
pub mod sync;
pub mod validate;

pub use board::{DefaultBoard, IssueBoard};
pub use error::{Error, Result};
pub use model::{Issue, IssueStatus, Priority, StatsSummary};
