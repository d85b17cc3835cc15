//! Backup DTOs and migrations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use version_migrate::{FromDomain, IntoDomain, Versioned};

use tenantsync_core::backup::BackupRecord;

use super::ConfigEntityV1_0_0;

/// Backup V1.0.0. The payload is pinned to the entity schema it was captured
/// with so old snapshots stay readable after the entity format moves on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.0.0")]
#[serde(rename_all = "camelCase")]
pub struct BackupRecordV1_0_0 {
    pub backup_id: String,
    pub entity_id: String,
    pub reason: String,
    pub captured_at: DateTime<Utc>,
    pub size_bytes: u64,
    pub payload: ConfigEntityV1_0_0,
}

impl IntoDomain<BackupRecord> for BackupRecordV1_0_0 {
    fn into_domain(self) -> BackupRecord {
        BackupRecord {
            backup_id: self.backup_id,
            entity_id: self.entity_id,
            reason: self.reason,
            captured_at: self.captured_at,
            size_bytes: self.size_bytes,
            payload: self.payload.into_domain(),
        }
    }
}

impl FromDomain<BackupRecord> for BackupRecordV1_0_0 {
    fn from_domain(record: BackupRecord) -> Self {
        BackupRecordV1_0_0 {
            backup_id: record.backup_id,
            entity_id: record.entity_id,
            reason: record.reason,
            captured_at: record.captured_at,
            size_bytes: record.size_bytes,
            payload: ConfigEntityV1_0_0::from_domain(record.payload),
        }
    }
}

/// Creates the migrator for backup records.
pub fn create_backup_migrator() -> Result<version_migrate::Migrator, String> {
    let mut migrator = version_migrate::Migrator::builder().build();

    // V1.0.0 -> BackupRecord
    let backup_path = version_migrate::Migrator::define("backup")
        .from::<BackupRecordV1_0_0>()
        .into_with_save::<BackupRecord>();

    migrator
        .register(backup_path)
        .map_err(|e| format!("Failed to register backup migration path: {}", e))?;

    Ok(migrator)
}
