//! HttpConfigClient - the configuration API seen from a remote session.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tenantsync_core::backup::{BackupMetadata, BackupRecord};
use tenantsync_core::client::ConfigClient;
use tenantsync_core::entity::ConfigEntity;
use tenantsync_core::error::{Result, TenantSyncError};

/// Header carrying the acting identity.
pub const ACTOR_HEADER: &str = "x-actor-id";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct UpdateSectionRequest<'a> {
    section: &'a str,
    data: &'a Value,
}

#[derive(Debug, Deserialize)]
struct UpdateSectionResponse {
    data: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BackupActionRequest<'a> {
    action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    backup_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_age_days: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CreateBackupResponse {
    backup: BackupMetadata,
}

#[derive(Debug, Deserialize)]
struct RestoreBackupResponse {
    entity: ConfigEntity,
}

/// Result of a retention sweep as reported by the server.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CleanupSummary {
    pub removed: usize,
    pub deleted: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    kind: String,
}

/// Talks to a `tenantsyncd` instance on behalf of one actor.
#[derive(Clone)]
pub struct HttpConfigClient {
    client: Client,
    base_url: String,
    actor: String,
    timeout: Duration,
}

impl HttpConfigClient {
    pub fn new(base_url: impl Into<String>, actor: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            actor: actor.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(ACTOR_HEADER, &self.actor)
            .timeout(self.timeout)
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self
            .request(builder)
            .send()
            .await
            .map_err(|e| TenantSyncError::unavailable(format!("Request failed: {}", e)))?;
        let response = check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| TenantSyncError::internal(format!("Unexpected response body: {}", e)))
    }

    /// Shallow-merges `data` into one section server-side.
    pub async fn update_section(
        &self,
        entity_id: &str,
        section: &str,
        data: &Value,
    ) -> Result<Value> {
        let url = format!("{}/config/{}", self.base_url, entity_id);
        let body = UpdateSectionRequest { section, data };
        let response: UpdateSectionResponse = self.send(self.client.put(url).json(&body)).await?;
        Ok(response.data)
    }

    pub async fn delete_entity(&self, entity_id: &str, must_exist: bool) -> Result<()> {
        let url = format!("{}/config/{}", self.base_url, entity_id);
        let _: Value = self
            .send(
                self.client
                    .delete(url)
                    .query(&[("mustExist", must_exist)]),
            )
            .await?;
        Ok(())
    }

    pub async fn list_backups(&self, entity_id: &str) -> Result<Vec<BackupMetadata>> {
        let url = format!("{}/backups/{}", self.base_url, entity_id);
        self.send(self.client.get(url)).await
    }

    pub async fn get_backup(&self, entity_id: &str, backup_id: &str) -> Result<BackupRecord> {
        let url = format!("{}/backups/{}/{}", self.base_url, entity_id, backup_id);
        self.send(self.client.get(url)).await
    }

    pub async fn create_backup(
        &self,
        entity_id: &str,
        reason: Option<&str>,
    ) -> Result<BackupMetadata> {
        let body = BackupActionRequest {
            action: "create",
            backup_id: None,
            reason,
            max_age_days: None,
        };
        let response: CreateBackupResponse = self.backup_action(entity_id, &body).await?;
        Ok(response.backup)
    }

    pub async fn restore_backup(&self, entity_id: &str, backup_id: &str) -> Result<ConfigEntity> {
        let body = BackupActionRequest {
            action: "restore",
            backup_id: Some(backup_id),
            reason: None,
            max_age_days: None,
        };
        let response: RestoreBackupResponse = self.backup_action(entity_id, &body).await?;
        Ok(response.entity)
    }

    /// Prunes snapshots across all entities; `None` uses the server's
    /// retention setting.
    pub async fn cleanup_backups(
        &self,
        entity_id: &str,
        max_age_days: Option<u32>,
    ) -> Result<CleanupSummary> {
        let body = BackupActionRequest {
            action: "cleanup",
            backup_id: None,
            reason: None,
            max_age_days,
        };
        self.backup_action(entity_id, &body).await
    }

    async fn backup_action<T: DeserializeOwned>(
        &self,
        entity_id: &str,
        body: &BackupActionRequest<'_>,
    ) -> Result<T> {
        let url = format!("{}/backups/{}", self.base_url, entity_id);
        self.send(self.client.post(url).json(body)).await
    }
}

#[async_trait]
impl ConfigClient for HttpConfigClient {
    async fn read_entity(&self, entity_id: &str) -> Result<ConfigEntity> {
        let url = format!("{}/config/{}", self.base_url, entity_id);
        self.send(self.client.get(url)).await
    }

    /// The session always sends the whole local section, so the server-side
    /// merge yields exactly that section.
    async fn write_section(&self, entity_id: &str, section: &str, data: &Value) -> Result<Value> {
        self.update_section(entity_id, section, data).await
    }
}

/// Maps an error response back onto the shared error type.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs);
    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<ErrorBody>(&text).unwrap_or(ErrorBody {
        error: text,
        kind: String::new(),
    });

    Err(match status {
        StatusCode::BAD_REQUEST => TenantSyncError::validation("request", body.error),
        StatusCode::NOT_FOUND => TenantSyncError::not_found("resource", body.error),
        StatusCode::TOO_MANY_REQUESTS => TenantSyncError::Throttled {
            retry_after: retry_after.unwrap_or(Duration::from_secs(1)),
        },
        _ if body.kind == "unavailable" => TenantSyncError::unavailable(body.error),
        _ => TenantSyncError::unavailable(format!("Server answered {}: {}", status, body.error)),
    })
}
