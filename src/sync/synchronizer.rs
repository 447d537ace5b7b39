//! Dual-write synchronizer.
//!
//! Every write goes to the primary store first. Only once the primary has
//! accepted it is the change mirrored into the secondary store, and mirror
//! failures are recorded as drift rather than returned.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::DEFAULT_CREATE_TIMEOUT_SECS;
use crate::error::{Error, Result};
use crate::imaging::{EncodedImage, ImagePipeline, SourceImage};
use crate::logging::MIRROR_TARGET;
use crate::model::{AnalyzeResult, ImageAttachment, Issue, IssueStatus, NewIssue};
use crate::store::{BlobStore, PrimaryStore, SecondaryStore};
use crate::validate::validate_report;

use super::audit::{compare, DriftReport};
use super::drift::{DriftLog, MirrorEventKind};

/// Outcome of a repair pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairStats {
    pub mirrored: usize,
    pub failed: usize,
}

/// Writes issues to the primary store and mirrors them best effort.
pub struct Synchronizer<P, S, B> {
    primary: Arc<P>,
    secondary: Arc<S>,
    blobs: B,
    pipeline: ImagePipeline,
    create_timeout: Duration,
    drift: DriftLog,
}

impl<P, S, B> Synchronizer<P, S, B>
where
    P: PrimaryStore,
    S: SecondaryStore,
    B: BlobStore,
{
    pub fn new(primary: Arc<P>, secondary: Arc<S>, blobs: B) -> Self {
        Self {
            primary,
            secondary,
            blobs,
            pipeline: ImagePipeline::default(),
            create_timeout: Duration::from_secs(DEFAULT_CREATE_TIMEOUT_SECS),
            drift: DriftLog::new(),
        }
    }

    #[must_use]
    pub fn with_pipeline(mut self, pipeline: ImagePipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    #[must_use]
    pub fn with_create_timeout(mut self, timeout: Duration) -> Self {
        self.create_timeout = timeout;
        self
    }

    /// Shared handle to the mirror drift log.
    #[must_use]
    pub fn drift_log(&self) -> &DriftLog {
        &self.drift
    }

    /// Submit a new report.
    ///
    /// Steps run strictly in order: validate, resize and store the photo,
    /// create in the primary store (bounded by the create timeout), mirror.
    ///
    /// # Errors
    ///
    /// - `RequiredField` / `InvalidBuilding` before any I/O
    /// - `ImageDecode` / `ImageEncode` if the photo cannot be processed
    /// - `SubmissionFailed` if the primary create fails or times out
    pub async fn submit(
        &self,
        building: &str,
        description: &str,
        image: Option<&SourceImage>,
    ) -> Result<Issue> {
        let report = validate_report(building, description)?;
        let span = info_span!("submit", submission = %Uuid::new_v4(), building = report.building);

        async move {
            let attachment = match image {
                Some(source) => Some(self.store_photo(source).await?),
                None => None,
            };
            let payload = NewIssue::new(report.building.to_string(), report.description, attachment);

            let mut created = self.create_primary(&payload).await?;
            payload.apply_image_fields(&mut created);
            info!(issue_id = %created.id, category = %created.category, "Issue created");

            self.mirror_created(&created).await;
            Ok(created)
        }
        .instrument(span)
        .await
    }

    /// Resize the photo, then upload it or fall back to an inline payload.
    async fn store_photo(&self, source: &SourceImage) -> Result<ImageAttachment> {
        let encoded = self.pipeline.resize(source).await?;
        let key = upload_key(&source.file_name, Utc::now().timestamp_millis());

        match self
            .blobs
            .upload(&key, &encoded.bytes, encoded.content_type())
            .await
        {
            Ok(url) => {
                debug!(key = %key, "Photo stored in blob storage");
                Ok(ImageAttachment::Url(url))
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Photo upload failed, sending inline");
                Ok(inline(&encoded))
            }
        }
    }

    async fn create_primary(&self, payload: &NewIssue) -> Result<Issue> {
        match tokio::time::timeout(self.create_timeout, self.primary.create_issue(payload)).await {
            Ok(Ok(issue)) => Ok(issue),
            Ok(Err(e)) => {
                warn!(error = %e, "Primary create failed");
                Err(Error::submission_failed(e))
            }
            Err(_) => {
                let seconds = self.create_timeout.as_secs();
                warn!(seconds, "Primary create timed out");
                Err(Error::submission_failed(Error::Timeout {
                    operation: "create issue",
                    seconds,
                }))
            }
        }
    }

    async fn mirror_created(&self, created: &Issue) {
        let mut copy = created.clone();
        copy.created_at = Utc::now();
        copy.image_base64 = None;

        match self.secondary.mirror_issue(&copy).await {
            Ok(()) => {
                debug!(target: MIRROR_TARGET, issue_id = %created.id, store = self.secondary.name(), "Mirrored new issue");
                self.drift.record(MirrorEventKind::Created, &created.id, None);
            }
            Err(e) => {
                warn!(target: MIRROR_TARGET, issue_id = %created.id, store = self.secondary.name(), error = %e, "Mirror create failed");
                self.drift
                    .record(MirrorEventKind::CreateFailed, &created.id, Some(e.to_string()));
            }
        }
    }

    /// Set the status of an issue.
    ///
    /// Any transition is allowed; concurrent updates are last-write-wins in
    /// the primary store.
    ///
    /// # Errors
    ///
    /// Returns `RequiredField` for a blank id and `UpdateFailed` if the
    /// primary patch fails. Mirror failures are not returned.
    pub async fn set_status(&self, id: &str, status: IssueStatus) -> Result<()> {
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::RequiredField { field: "id" });
        }

        if let Err(e) = self.primary.update_status(id, status).await {
            warn!(issue_id = %id, error = %e, "Primary status update failed");
            return Err(Error::update_failed(e));
        }
        info!(issue_id = %id, status = %status, "Status updated");

        match self.secondary.update_status(id, status).await {
            Ok(()) => {
                debug!(target: MIRROR_TARGET, issue_id = %id, status = %status, "Mirrored status");
                self.drift.record(MirrorEventKind::StatusMirrored, id, None);
            }
            Err(e) => {
                warn!(target: MIRROR_TARGET, issue_id = %id, store = self.secondary.name(), error = %e, "Mirror status update failed");
                self.drift
                    .record(MirrorEventKind::StatusFailed, id, Some(e.to_string()));
            }
        }
        Ok(())
    }

    /// Ask the primary backend how it would categorize a report.
    ///
    /// # Errors
    ///
    /// Returns image errors or the primary store's error.
    pub async fn analyze(&self, description: &str, image: Option<&SourceImage>) -> Result<AnalyzeResult> {
        let inline_image = match image {
            Some(source) => Some(self.pipeline.resize(source).await?.to_base64()),
            None => None,
        };
        self.primary.analyze(description, inline_image.as_deref()).await
    }

    /// Compare both stores.
    ///
    /// # Errors
    ///
    /// Returns an error if either store cannot be listed.
    pub async fn audit_mirror(&self) -> Result<(Vec<Issue>, DriftReport)> {
        let primary = self.primary.list_issues().await?;
        let secondary = self.secondary.list_issues().await?;
        let report = compare(&primary, &secondary);
        info!(
            target: MIRROR_TARGET,
            missing = report.missing_in_secondary.len(),
            orphaned = report.orphaned_in_secondary.len(),
            diverged = report.diverged.len(),
            in_sync = report.in_sync,
            "Mirror audit complete"
        );
        Ok((primary, report))
    }

    /// Re-mirror every missing or diverged record from the primary store.
    ///
    /// Orphans are reported by the audit but left in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the audit cannot list both stores.
    pub async fn repair_mirror(&self) -> Result<RepairStats> {
        let (primary, report) = self.audit_mirror().await?;
        let mut stats = RepairStats::default();

        for id in report.needs_repair() {
            let Some(issue) = primary.iter().find(|i| i.id == id) else {
                continue;
            };
            let mut copy = issue.clone();
            copy.image_base64 = None;

            match self.secondary.mirror_issue(&copy).await {
                Ok(()) => {
                    stats.mirrored += 1;
                    self.drift.record(MirrorEventKind::Repaired, id, None);
                }
                Err(e) => {
                    stats.failed += 1;
                    warn!(target: MIRROR_TARGET, issue_id = %id, error = %e, "Mirror repair failed");
                    self.drift
                        .record(MirrorEventKind::RepairFailed, id, Some(e.to_string()));
                }
            }
        }

        info!(target: MIRROR_TARGET, mirrored = stats.mirrored, failed = stats.failed, "Mirror repair complete");
        Ok(stats)
    }
}

fn inline(encoded: &EncodedImage) -> ImageAttachment {
    ImageAttachment::Inline(encoded.to_base64())
}

/// Blob key for a photo: `issues/{millis}_{file name}`.
///
/// Characters outside `[A-Za-z0-9._-]` become `_`.
fn upload_key(file_name: &str, millis: i64) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let name = if sanitized.is_empty() { "photo.jpg" } else { sanitized.as_str() };
    format!("issues/{millis}_{name}")
}
