use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tenantsync_core::client::ConfigClient;
use tenantsync_core::entity::ConfigEntity;
use tenantsync_core::error::Result;

use crate::config_usecase::ConfigUseCase;

/// [`ConfigClient`] backed by an in-process [`ConfigUseCase`].
///
/// Writes go through the same path as the HTTP API, so snapshots and
/// propagation happen exactly as they would for a remote session.
pub struct LocalConfigClient {
    usecase: Arc<ConfigUseCase>,
    actor: String,
}

impl LocalConfigClient {
    pub fn new(usecase: Arc<ConfigUseCase>, actor: impl Into<String>) -> Self {
        Self {
            usecase,
            actor: actor.into(),
        }
    }
}

#[async_trait]
impl ConfigClient for LocalConfigClient {
    async fn read_entity(&self, entity_id: &str) -> Result<ConfigEntity> {
        self.usecase.read_entity(entity_id).await
    }

    async fn write_section(&self, entity_id: &str, section: &str, data: &Value) -> Result<Value> {
        self.usecase
            .write_section(entity_id, section, data.clone(), &self.actor)
            .await
    }
}
