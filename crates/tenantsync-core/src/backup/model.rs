//! Backup snapshot domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::ConfigEntity;

/// Well-known snapshot reasons.
pub mod reason {
    /// Explicit user request.
    pub const MANUAL: &str = "manual";
    /// Captured before a write to a sensitive section.
    pub const PRE_CHANGE: &str = "pre-change";
    /// Captured before a restore overwrites the entity.
    pub const PRE_RESTORE: &str = "pre-restore";
    /// Captured before the entity is deleted.
    pub const PRE_DELETE: &str = "pre-delete";
}

/// Immutable full copy of an entity at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    /// Generated id embedding entity, reason and capture time.
    pub backup_id: String,
    pub entity_id: String,
    /// Free-form action tag, e.g. "manual" or "pre-change".
    pub reason: String,
    pub captured_at: DateTime<Utc>,
    /// Size of the serialized payload in bytes.
    pub size_bytes: u64,
    /// The entity as it was at capture time.
    pub payload: ConfigEntity,
}

/// Listing view of a [`BackupRecord`] without its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    pub backup_id: String,
    pub entity_id: String,
    pub reason: String,
    pub captured_at: DateTime<Utc>,
    pub size_bytes: u64,
}

impl BackupRecord {
    /// Returns the listing view of this record.
    pub fn metadata(&self) -> BackupMetadata {
        BackupMetadata {
            backup_id: self.backup_id.clone(),
            entity_id: self.entity_id.clone(),
            reason: self.reason.clone(),
            captured_at: self.captured_at,
            size_bytes: self.size_bytes,
        }
    }
}

/// Builds a backup id of the form `{entity}_{reason}_{YYYYmmddTHHMMSSmmmZ}`.
///
/// The reason is reduced to lowercase ASCII alphanumerics and dashes so the
/// id is always safe as a file name. The timestamp suffix gives ids of the
/// same entity and reason a natural chronological order.
pub fn generate_backup_id(entity_id: &str, reason: &str, captured_at: DateTime<Utc>) -> String {
    let reason_slug: String = reason
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let reason_slug = if reason_slug.is_empty() {
        "unspecified".to_string()
    } else {
        reason_slug
    };

    format!(
        "{}_{}_{}",
        entity_id,
        reason_slug,
        captured_at.format("%Y%m%dT%H%M%S%3fZ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generate_backup_id_embeds_parts() {
        let at = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap()
            + chrono::Duration::milliseconds(89);
        let id = generate_backup_id("E1", "manual", at);
        assert_eq!(id, "E1_manual_20260304T050607089Z");
    }

    #[test]
    fn test_generate_backup_id_sanitizes_reason() {
        let at = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let id = generate_backup_id("E1", "Bulk Admin/Removal", at);
        assert!(id.starts_with("E1_bulk-admin-removal_"));

        let id = generate_backup_id("E1", "", at);
        assert!(id.starts_with("E1_unspecified_"));
    }
}
