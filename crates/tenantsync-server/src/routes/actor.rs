use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;
use tenantsync_core::error::TenantSyncError;

use crate::error::ApiError;

/// Header carrying the acting identity.
pub const ACTOR_HEADER: &str = "x-actor-id";

const ANONYMOUS: &str = "anonymous";

/// Acting identity from the `x-actor-id` header.
///
/// Mutations require it; reads fall back to `anonymous`.
#[derive(Debug, Clone)]
pub struct Actor(Option<String>);

impl Actor {
    pub fn required(&self) -> Result<&str, ApiError> {
        self.0
            .as_deref()
            .ok_or_else(|| ApiError(TenantSyncError::missing("actor")))
    }

    pub fn or_anonymous(&self) -> &str {
        self.0.as_deref().unwrap_or(ANONYMOUS)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Ok(Self(actor))
    }
}
