//! `/upstream/{entityId}/{resource}`: cached reads of the throttled upstream.

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tenantsync_application::fetch::FetchOptions;
use tenantsync_core::entity::validate_entity_id;
use tenantsync_core::error::TenantSyncError;

use super::actor::Actor;
use crate::app::SharedState;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct UpstreamQuery {
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Serialize)]
pub struct UpstreamResponse {
    pub data: Value,
    /// `fresh`, `cached` or `stale`.
    pub source: &'static str,
}

/// GET `[?refresh=true]`. Cache entries are scoped by actor, entity and
/// resource.
pub async fn get_upstream(
    State(state): State<SharedState>,
    Path((entity_id, resource)): Path<(String, String)>,
    actor: Actor,
    query: Result<Query<UpstreamQuery>, QueryRejection>,
) -> Result<Json<UpstreamResponse>, ApiError> {
    let Query(query) = query?;
    validate_entity_id(&entity_id)?;
    validate_resource(&resource)?;

    let Some(upstream) = state.upstream.clone() else {
        return Err(TenantSyncError::not_found("upstream", resource).into());
    };

    let key = format!("{}:{}:{}", actor.or_anonymous(), entity_id, resource);
    let options = FetchOptions {
        force_refresh: query.refresh,
        ..FetchOptions::default()
    };
    let fetched = state
        .upstream_fetcher
        .fetch_cached(&key, options, || upstream.fetch(&entity_id, &resource))
        .await?;

    Ok(Json(UpstreamResponse {
        data: fetched.value,
        source: fetched.source.as_str(),
    }))
}

fn validate_resource(resource: &str) -> Result<(), TenantSyncError> {
    let valid = !resource.is_empty()
        && resource.len() <= 64
        && resource
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(TenantSyncError::validation(
            "resource",
            "must be 1-64 ASCII letters, digits, '_' or '-'",
        ))
    }
}
