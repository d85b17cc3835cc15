//! `/config/{entityId}`: read, partial update, delete.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tenantsync_core::entity::ConfigEntity;
use tenantsync_core::error::TenantSyncError;

use super::actor::Actor;
use crate::app::SharedState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct UpdateSectionRequest {
    pub section: Option<String>,
    pub data: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct UpdateSectionResponse {
    pub section: String,
    pub data: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteQuery {
    #[serde(default)]
    pub must_exist: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub entity_id: String,
    pub deleted: bool,
}

/// GET: never 404, unknown entities read as defaults.
pub async fn get_config(
    State(state): State<SharedState>,
    Path(entity_id): Path<String>,
) -> Result<Json<ConfigEntity>, ApiError> {
    let entity = state.config_usecase.read_entity(&entity_id).await?;
    Ok(Json(entity))
}

/// PUT `{ section, data }`: shallow-merges `data` into the section.
pub async fn update_section(
    State(state): State<SharedState>,
    Path(entity_id): Path<String>,
    actor: Actor,
    body: Result<Json<UpdateSectionRequest>, JsonRejection>,
) -> Result<Json<UpdateSectionResponse>, ApiError> {
    let Json(body) = body?;
    let actor = actor.required()?;

    let section = body
        .section
        .ok_or_else(|| TenantSyncError::missing("section"))?;
    let data = match body.data {
        Some(data @ Value::Object(_)) => data,
        Some(_) => {
            return Err(TenantSyncError::validation("data", "must be a JSON object").into());
        }
        None => return Err(TenantSyncError::missing("data").into()),
    };

    let merged = state
        .config_usecase
        .update_section(&entity_id, &section, data, actor)
        .await?;

    Ok(Json(UpdateSectionResponse {
        section,
        data: merged,
    }))
}

/// DELETE `[?mustExist=true]`: idempotent unless `mustExist` is set.
pub async fn delete_config(
    State(state): State<SharedState>,
    Path(entity_id): Path<String>,
    actor: Actor,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let Query(query) = query?;
    let actor = actor.required()?;

    state
        .config_usecase
        .delete_entity(&entity_id, actor, query.must_exist)
        .await?;

    Ok(Json(DeleteResponse {
        entity_id,
        deleted: true,
    }))
}
