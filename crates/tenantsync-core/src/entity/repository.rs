//! Config entity repository trait.
//!
//! Defines the interface for durable entity persistence.

use super::model::ConfigEntity;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract repository for durable config entities.
///
/// This trait decouples the store logic from the storage mechanism
/// (JSON files, database, remote API).
///
/// # Implementation Notes
///
/// Implementations must persist the whole entity atomically: a reader sees
/// either the previous record or the new one, never a partial write.
/// Serializing writers is the caller's job (see `VersionedStore`).
#[async_trait]
pub trait ConfigRepository: Send + Sync {
    /// Finds a durable entity by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(ConfigEntity))`: Entity found
    /// - `Ok(None)`: No durable record exists
    /// - `Err(_)`: Storage could not be read
    async fn find_by_id(&self, entity_id: &str) -> Result<Option<ConfigEntity>>;

    /// Persists the whole entity, replacing any previous record.
    async fn save(&self, entity: &ConfigEntity) -> Result<()>;

    /// Deletes an entity.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: A durable record existed and was removed
    /// - `Ok(false)`: Nothing to delete
    async fn delete(&self, entity_id: &str) -> Result<bool>;

    /// Lists the IDs of all durable entities.
    async fn list_ids(&self) -> Result<Vec<String>>;
}
