//! ConfigEntity DTOs and migrations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use version_migrate::{FromDomain, IntoDomain, Versioned};

use tenantsync_core::entity::ConfigEntity;

/// ConfigEntity V1.0.0: sections keyed by name, plus the last writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.0.0")]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntityV1_0_0 {
    pub entity_id: String,
    pub sections: BTreeMap<String, Value>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

impl IntoDomain<ConfigEntity> for ConfigEntityV1_0_0 {
    fn into_domain(self) -> ConfigEntity {
        ConfigEntity {
            entity_id: self.entity_id,
            sections: self.sections,
            updated_at: self.updated_at,
            updated_by: self.updated_by,
        }
    }
}

impl FromDomain<ConfigEntity> for ConfigEntityV1_0_0 {
    fn from_domain(entity: ConfigEntity) -> Self {
        ConfigEntityV1_0_0 {
            entity_id: entity.entity_id,
            sections: entity.sections,
            updated_at: entity.updated_at,
            updated_by: entity.updated_by,
        }
    }
}

/// Creates the migrator for config entity records.
///
/// Registration only fails for a malformed migration chain, which is a
/// programming error; it surfaces as `Err` from storage construction.
pub fn create_config_entity_migrator() -> Result<version_migrate::Migrator, String> {
    let mut migrator = version_migrate::Migrator::builder().build();

    // V1.0.0 -> ConfigEntity
    let entity_path = version_migrate::Migrator::define("config_entity")
        .from::<ConfigEntityV1_0_0>()
        .into_with_save::<ConfigEntity>();

    migrator
        .register(entity_path)
        .map_err(|e| format!("Failed to register config entity migration path: {}", e))?;

    Ok(migrator)
}
