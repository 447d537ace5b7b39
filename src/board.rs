//! Explicit view state for a UI controller.
//!
//! `IssueBoard` owns the issue list and dashboard stats a view renders.
//! Each operation has one entry point, and every state change replaces the
//! held list or stats as a whole, so a renderer never sees a half-updated
//! collection. Writes are followed by a fresh read instead of patching the
//! local copy.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::Settings;
use crate::error::Result;
use crate::imaging::{ImagePipeline, SourceImage, DEFAULT_JPEG_QUALITY};
use crate::model::{AnalyzeResult, Issue, IssueStatus, StatsSummary};
use crate::reconcile::{ReadSource, Reconciler};
use crate::store::{
    BlobStore, FirebaseBlobStore, MirrorBackend, PrimaryStore, RestPrimaryStore, SecondaryStore,
};
use crate::sync::{DriftLog, DriftReport, RepairStats, Synchronizer};
use crate::validate::normalize_status;

pub struct IssueBoard<P, S, B> {
    sync: Synchronizer<P, S, B>,
    reader: Reconciler<P, S>,
    issues: Vec<Issue>,
    stats: Option<StatsSummary>,
    last_source: Option<ReadSource>,
}

/// Board wired to the configured REST primary, mirror and bucket.
pub type DefaultBoard = IssueBoard<RestPrimaryStore, MirrorBackend, FirebaseBlobStore>;

impl DefaultBoard {
    /// Build a board from resolved settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the mirror cannot be opened or the image width is
    /// invalid.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let primary = Arc::new(RestPrimaryStore::from_settings(settings));
        let secondary = Arc::new(MirrorBackend::from_settings(settings)?);
        let blobs = FirebaseBlobStore::from_settings(settings);
        let pipeline = ImagePipeline::new(settings.max_image_width, DEFAULT_JPEG_QUALITY)?;

        info!(
            backend = %settings.backend_url,
            mirror = %settings.mirror,
            bucket = settings.storage_bucket.is_some(),
            "Issue board configured"
        );
        Ok(Self::new(primary, secondary, blobs)
            .with_pipeline(pipeline)
            .with_create_timeout(settings.create_timeout))
    }
}

impl<P, S, B> IssueBoard<P, S, B>
where
    P: PrimaryStore,
    S: SecondaryStore,
    B: BlobStore,
{
    pub fn new(primary: Arc<P>, secondary: Arc<S>, blobs: B) -> Self {
        Self {
            sync: Synchronizer::new(Arc::clone(&primary), Arc::clone(&secondary), blobs),
            reader: Reconciler::new(primary, secondary),
            issues: Vec::new(),
            stats: None,
            last_source: None,
        }
    }

    #[must_use]
    pub fn with_pipeline(mut self, pipeline: ImagePipeline) -> Self {
        self.sync = self.sync.with_pipeline(pipeline);
        self
    }

    #[must_use]
    pub fn with_create_timeout(mut self, timeout: Duration) -> Self {
        self.sync = self.sync.with_create_timeout(timeout);
        self
    }

    /// Held issues, newest first.
    #[must_use]
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    #[must_use]
    pub fn stats(&self) -> Option<&StatsSummary> {
        self.stats.as_ref()
    }

    /// Store that served the last successful refresh.
    #[must_use]
    pub fn last_source(&self) -> Option<ReadSource> {
        self.last_source
    }

    #[must_use]
    pub fn drift_log(&self) -> &DriftLog {
        self.sync.drift_log()
    }

    /// Submit a report, then re-read the list.
    ///
    /// A failed re-read does not fail the submission.
    ///
    /// # Errors
    ///
    /// Returns the synchronizer's error; the held list is left untouched.
    pub async fn submit(
        &mut self,
        building: &str,
        description: &str,
        image: Option<&SourceImage>,
    ) -> Result<Issue> {
        let issue = self.sync.submit(building, description, image).await?;
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Refresh after submit failed");
        }
        if self.stats.is_some() {
            self.refresh_stats().await;
        }
        Ok(issue)
    }

    /// Change an issue's status, then re-read the list and any held stats.
    ///
    /// # Errors
    ///
    /// Returns `UpdateFailed` if the primary rejects the change.
    pub async fn set_status(&mut self, id: &str, status: IssueStatus) -> Result<()> {
        self.sync.set_status(id, status).await?;
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Refresh after status update failed");
        }
        if self.stats.is_some() {
            self.refresh_stats().await;
        }
        Ok(())
    }

    /// [`set_status`](Self::set_status) from a free-text label
    /// (`"done"`, `"in progress"`, ...).
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatus` for unknown labels, else as `set_status`.
    pub async fn set_status_label(&mut self, id: &str, label: &str) -> Result<()> {
        let status = normalize_status(label)?;
        self.set_status(id, status).await
    }

    /// Replace the held list with a fresh read.
    ///
    /// # Errors
    ///
    /// Returns an error when both stores fail; the previous list is kept.
    pub async fn refresh(&mut self) -> Result<&[Issue]> {
        let listing = self.reader.list_issues_with_source().await?;
        self.issues = listing.issues;
        self.last_source = Some(listing.source);
        Ok(&self.issues)
    }

    /// Replace the held stats, deriving them from the held list if the
    /// primary is unavailable.
    pub async fn refresh_stats(&mut self) -> &StatsSummary {
        let stats = self.reader.get_stats(&self.issues).await;
        self.stats.insert(stats)
    }

    /// Category/priority preview for a draft report.
    ///
    /// # Errors
    ///
    /// Returns image or primary store errors.
    pub async fn analyze(&self, description: &str, image: Option<&SourceImage>) -> Result<AnalyzeResult> {
        self.sync.analyze(description, image).await
    }

    /// # Errors
    ///
    /// Returns an error if either store cannot be listed.
    pub async fn audit_mirror(&self) -> Result<DriftReport> {
        Ok(self.sync.audit_mirror().await?.1)
    }

    /// # Errors
    ///
    /// Returns an error if either store cannot be listed.
    pub async fn repair_mirror(&self) -> Result<RepairStats> {
        self.sync.repair_mirror().await
    }
}
