//! Content hashing for mirror drift detection.
//!
//! Only the fields both stores replicate are hashed. `created_at` is left out
//! because the mirror stamps its own, and `image_base64` never reaches the
//! mirror.

use sha2::{Digest, Sha256};

use crate::model::Issue;

/// Compute a SHA256 fingerprint of the replicated fields of an issue.
///
/// Fields are fed in a fixed order with a unit separator between them, so
/// `("ab", "c")` and `("a", "bc")` hash differently.
#[must_use]
pub fn content_hash(issue: &Issue) -> String {
    let mut hasher = Sha256::new();
    let fields = [
        issue.id.as_str(),
        issue.building.as_str(),
        issue.description.as_str(),
        issue.category.as_str(),
        issue.priority.as_str(),
        issue.status.as_str(),
        issue.image_url.as_deref().unwrap_or(""),
    ];
    for field in fields {
        hasher.update(field.as_bytes());
        hasher.update([0x1f]);
    }
    format!("{:x}", hasher.finalize())
}

/// Check if a mirrored record differs from its primary counterpart.
#[must_use]
pub fn has_changed(current_hash: &str, stored_hash: Option<&str>) -> bool {
    stored_hash.is_none_or(|h| h != current_hash)
}
