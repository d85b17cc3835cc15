//! `/backups/{entityId}`: snapshot actions and listing.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tenantsync_core::backup::{BackupMetadata, BackupRecord, reason};
use tenantsync_core::entity::{ConfigEntity, validate_entity_id};
use tenantsync_core::error::TenantSyncError;

use super::actor::Actor;
use crate::app::SharedState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupActionRequest {
    pub action: Option<String>,
    pub backup_id: Option<String>,
    pub reason: Option<String>,
    pub max_age_days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CreateBackupResponse {
    pub backup: BackupMetadata,
}

#[derive(Debug, Serialize)]
pub struct RestoreBackupResponse {
    pub entity: ConfigEntity,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub removed: usize,
    pub deleted: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBackupResponse {
    pub backup_id: String,
    pub deleted: bool,
}

/// POST `{ action: "create" | "restore" | "cleanup", ... }`.
///
/// `cleanup` prunes across all entities, using `maxAgeDays` or the
/// configured retention.
pub async fn backup_action(
    State(state): State<SharedState>,
    Path(entity_id): Path<String>,
    actor: Actor,
    body: Result<Json<BackupActionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let actor = actor.required()?;
    validate_entity_id(&entity_id)?;
    let backups = state.config_usecase.backups();

    match body.action.as_deref() {
        Some("create") => {
            let tag = body.reason.as_deref().unwrap_or(reason::MANUAL);
            let backup = backups.capture(&entity_id, tag).await?;
            tracing::info!(
                "[Api] {} captured backup {} of {}",
                actor,
                backup.backup_id,
                entity_id
            );
            Ok((StatusCode::CREATED, Json(CreateBackupResponse { backup })).into_response())
        }
        Some("restore") => {
            let backup_id = body
                .backup_id
                .ok_or_else(|| TenantSyncError::missing("backupId"))?;
            find_for_entity(&state, &entity_id, &backup_id).await?;

            let entity = state.config_usecase.restore_backup(&backup_id).await?;
            tracing::info!(
                "[Api] {} restored {} from {}",
                actor,
                entity_id,
                backup_id
            );
            Ok(Json(RestoreBackupResponse { entity }).into_response())
        }
        Some("cleanup") => {
            let max_age_days = body.max_age_days.unwrap_or(state.retention_days);
            let report = backups.prune(max_age_days).await?;
            Ok(Json(CleanupResponse {
                removed: report.removed(),
                deleted: report.deleted,
            })
            .into_response())
        }
        Some(other) => Err(TenantSyncError::validation(
            "action",
            format!("unknown action '{}', expected create, restore or cleanup", other),
        )
        .into()),
        None => Err(TenantSyncError::missing("action").into()),
    }
}

/// GET: snapshot metadata for the entity, newest first.
pub async fn list_backups(
    State(state): State<SharedState>,
    Path(entity_id): Path<String>,
) -> Result<Json<Vec<BackupMetadata>>, ApiError> {
    let list = state
        .config_usecase
        .backups()
        .list(Some(&entity_id))
        .await?;
    Ok(Json(list))
}

pub async fn get_backup(
    State(state): State<SharedState>,
    Path((entity_id, backup_id)): Path<(String, String)>,
) -> Result<Json<BackupRecord>, ApiError> {
    let record = find_for_entity(&state, &entity_id, &backup_id).await?;
    Ok(Json(record))
}

pub async fn delete_backup(
    State(state): State<SharedState>,
    Path((entity_id, backup_id)): Path<(String, String)>,
    actor: Actor,
) -> Result<Json<DeleteBackupResponse>, ApiError> {
    let actor = actor.required()?;
    find_for_entity(&state, &entity_id, &backup_id).await?;

    state.config_usecase.backups().delete(&backup_id).await?;
    tracing::info!("[Api] {} deleted backup {}", actor, backup_id);
    Ok(Json(DeleteBackupResponse {
        backup_id,
        deleted: true,
    }))
}

/// A snapshot addressed under another entity's path does not exist there.
async fn find_for_entity(
    state: &SharedState,
    entity_id: &str,
    backup_id: &str,
) -> Result<BackupRecord, ApiError> {
    let record = state.config_usecase.backups().get(backup_id).await?;
    if record.entity_id != entity_id {
        return Err(TenantSyncError::not_found("backup", backup_id).into());
    }
    Ok(record)
}
