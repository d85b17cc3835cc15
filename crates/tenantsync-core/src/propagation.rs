//! Propagation contract towards the live agent process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Body of the outbound notification: one section changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropagationEvent {
    pub entity_id: String,
    pub section: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl PropagationEvent {
    pub fn new(entity_id: impl Into<String>, section: impl Into<String>, data: Value) -> Self {
        Self {
            entity_id: entity_id.into(),
            section: section.into(),
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Delivers a [`PropagationEvent`] to the agent.
///
/// A single attempt per call. Failures are reported to the caller but must
/// never be treated as a failure of the write that produced the event.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &PropagationEvent) -> Result<()>;
}

/// Notifier used when no agent endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _event: &PropagationEvent) -> Result<()> {
        Ok(())
    }
}
