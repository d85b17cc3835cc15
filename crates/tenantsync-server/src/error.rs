//! HTTP mapping of [`TenantSyncError`].

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tenantsync_core::error::TenantSyncError;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
}

/// Handler error. Wraps the shared error type so it can become a response.
#[derive(Debug)]
pub struct ApiError(pub TenantSyncError);

impl From<TenantSyncError> for ApiError {
    fn from(err: TenantSyncError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(TenantSyncError::validation("body", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(TenantSyncError::validation("query", rejection.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            TenantSyncError::Validation { .. } => StatusCode::BAD_REQUEST,
            TenantSyncError::NotFound { .. } => StatusCode::NOT_FOUND,
            TenantSyncError::Throttled { .. } => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!("[Api] {}", self.0);
        } else {
            tracing::debug!("[Api] {}", self.0);
        }

        let body = ErrorResponse {
            error: self.0.to_string(),
            kind: self.0.kind(),
        };
        let mut response = (status, Json(body)).into_response();

        if let TenantSyncError::Throttled { retry_after } = &self.0 {
            // Round up so a sub-second wait never reads as "retry now"
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
