//! Client-side access to the authoritative store.
//!
//! An edit session talks to the store through this trait, whether the store
//! lives in-process or behind the HTTP API.

use async_trait::async_trait;
use serde_json::Value;

use crate::entity::ConfigEntity;
use crate::error::Result;

#[async_trait]
pub trait ConfigClient: Send + Sync {
    /// Reads the authoritative entity (defaults for unknown ids).
    async fn read_entity(&self, entity_id: &str) -> Result<ConfigEntity>;

    /// Commits one section and returns the value the store now holds.
    async fn write_section(&self, entity_id: &str, section: &str, data: &Value) -> Result<Value>;
}
