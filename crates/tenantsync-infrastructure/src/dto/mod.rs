//! Data Transfer Objects (DTOs) for persistence.
//!
//! These DTOs represent the versioned on-disk schema. They are private to
//! the infrastructure layer and keep the domain types free of storage
//! concerns. Every file is wrapped by version-migrate with its schema
//! version, and the migrators below walk old versions up to the domain type.
//!
//! ## Schema Versioning (Semantic Versioning)
//!
//! - **MAJOR (X.0.0)**: Breaking changes (field removal, type changes)
//! - **MINOR (1.X.0)**: Backward-compatible additions (new optional fields)
//!
//! ### ConfigEntity Version History
//! - **1.0.0**: Initial schema
//!
//! ### Backup Version History
//! - **1.0.0**: Initial schema

mod backup;
mod config_entity;

pub use backup::{BackupRecordV1_0_0, create_backup_migrator};
pub use config_entity::{ConfigEntityV1_0_0, create_config_entity_migrator};
