//! Shared construction for the version-migrate record directories.

use std::fmt::Display;
use std::path::Path;
use tenantsync_core::{Result, TenantSyncError};
use tokio::fs;
use version_migrate::{
    AppPaths, AsyncDirStorage, DirStorageStrategy, FilenameEncoding, FormatStrategy, Migrator,
    PathStrategy,
};

/// Opens `base_dir/<subdir>` as a directory of JSON records, one per id.
///
/// Ids are used as file names verbatim, so callers validate them first.
pub async fn open_dir_storage(
    base_dir: &Path,
    subdir: &str,
    migrator: Migrator,
) -> Result<AsyncDirStorage> {
    fs::create_dir_all(base_dir).await?;

    let paths =
        AppPaths::new("tenantsync").data_strategy(PathStrategy::CustomBase(base_dir.to_path_buf()));
    let strategy = DirStorageStrategy::default()
        .with_format(FormatStrategy::Json)
        .with_filename_encoding(FilenameEncoding::Direct);

    AsyncDirStorage::new(paths, subdir, migrator, strategy)
        .await
        .map_err(|e| TenantSyncError::internal(format!("Failed to open {} storage: {}", subdir, e)))
}

/// True when a storage error means the record file does not exist.
pub fn is_not_found(err: &impl Display) -> bool {
    let message = err.to_string();
    message.contains("No such file or directory")
        || message.contains("not found")
        || message.contains("cannot find")
}
