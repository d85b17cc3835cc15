pub mod config_service;
pub mod dto;
pub mod file_backup_repository;
pub mod file_config_repository;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::file_backup_repository::FileBackupRepository;
pub use crate::file_config_repository::FileConfigRepository;
pub use crate::paths::TenantSyncPaths;
