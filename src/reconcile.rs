//! Read path with primary-first failover.
//!
//! Exactly one store answers each read. The primary is always tried first;
//! the mirror is consulted only when the primary errors. The two are never
//! merged.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::model::{sort_newest_first, Issue, StatsSummary};
use crate::store::{PrimaryStore, SecondaryStore};

/// Which store produced a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    Primary,
    Secondary,
}

impl ReadSource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

/// Issues newest first, tagged with the store that served them.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub issues: Vec<Issue>,
    pub source: ReadSource,
}

pub struct Reconciler<P, S> {
    primary: Arc<P>,
    secondary: Arc<S>,
}

impl<P, S> Reconciler<P, S>
where
    P: PrimaryStore,
    S: SecondaryStore,
{
    pub fn new(primary: Arc<P>, secondary: Arc<S>) -> Self {
        Self { primary, secondary }
    }

    /// List every issue, newest `created_at` first.
    ///
    /// # Errors
    ///
    /// Returns the secondary store's error if both stores fail.
    pub async fn list_issues(&self) -> Result<Vec<Issue>> {
        Ok(self.list_issues_with_source().await?.issues)
    }

    /// Like [`list_issues`](Self::list_issues), also reporting the source.
    ///
    /// # Errors
    ///
    /// Returns the secondary store's error if both stores fail.
    pub async fn list_issues_with_source(&self) -> Result<Listing> {
        match self.primary.list_issues().await {
            Ok(mut issues) => {
                // Server order is not trusted.
                sort_newest_first(&mut issues);
                debug!(count = issues.len(), "Issues listed from primary");
                Ok(Listing {
                    issues,
                    source: ReadSource::Primary,
                })
            }
            Err(e) => {
                warn!(error = %e, store = self.secondary.name(), "Primary list failed, reading mirror");
                let mut issues = self.secondary.list_issues().await?;
                sort_newest_first(&mut issues);
                Ok(Listing {
                    issues,
                    source: ReadSource::Secondary,
                })
            }
        }
    }

    /// Dashboard stats from the primary, else derived from `held`.
    ///
    /// The fallback does not fetch; it counts whatever list the caller
    /// already has.
    pub async fn get_stats(&self, held: &[Issue]) -> StatsSummary {
        match self.primary.stats().await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, held = held.len(), "Primary stats failed, deriving locally");
                StatsSummary::from_issues(held)
            }
        }
    }
}
