//! Immutable configuration snapshots.

pub mod model;
pub mod repository;

pub use model::{BackupMetadata, BackupRecord, generate_backup_id, reason};
pub use repository::BackupRepository;

#[cfg(test)]
mod tests {
    use super::{generate_backup_id, reason};
    use chrono::Utc;

    #[test]
    fn test_reason_tags_reachable_from_backup_module() {
        let id = generate_backup_id("E1", reason::PRE_DELETE, Utc::now());
        assert!(id.starts_with("E1_pre-delete_"));
        assert_eq!(reason::PRE_RESTORE, "pre-restore");
    }
}
