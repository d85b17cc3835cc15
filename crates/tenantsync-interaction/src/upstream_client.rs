//! HttpUpstreamSource - single-shot reads from the throttled upstream API.

use async_trait::async_trait;
use reqwest::header::HeaderValue;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tenantsync_core::upstream::{RemoteError, UpstreamSource};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Reads `GET {base_url}/entities/{entityId}/{resource}`.
///
/// Classifies every failure for the cached fetcher: 429 with `Retry-After`
/// is a throttle, 5xx and network errors are transient, 404 is not-found
/// and anything else is permanent.
#[derive(Clone)]
pub struct HttpUpstreamSource {
    client: Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpUpstreamSource {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl UpstreamSource for HttpUpstreamSource {
    async fn fetch(&self, entity_id: &str, resource: &str) -> Result<Value, RemoteError> {
        let url = format!("{}/entities/{}/{}", self.base_url, entity_id, resource);
        let mut request = self.client.get(&url).timeout(self.timeout);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            tracing::debug!("[HttpUpstreamSource] Request to {} failed: {}", url, e);
            RemoteError::Transient(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<Value>()
                .await
                .map_err(|e| RemoteError::Permanent(format!("Invalid JSON from upstream: {}", e)));
        }

        let retry_after = parse_retry_after(response.headers().get("retry-after"));
        let body = response.text().await.unwrap_or_default();
        let error = map_http_error(status, body, retry_after);
        tracing::debug!("[HttpUpstreamSource] {} -> {}", url, error);
        Err(error)
    }
}

fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> RemoteError {
    let message = format!("{}: {}", status, body);
    match status {
        StatusCode::TOO_MANY_REQUESTS => RemoteError::Throttled {
            // No header: wait one second, the smallest declared wait
            retry_after: retry_after.unwrap_or(Duration::from_secs(1)),
        },
        StatusCode::NOT_FOUND => RemoteError::NotFound(message),
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => match retry_after {
            Some(retry_after) => RemoteError::Throttled { retry_after },
            None => RemoteError::Transient(message),
        },
        _ => RemoteError::Permanent(message),
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    // Fractional seconds show up in some rate-limit headers
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_server;
    use axum::extract::Path;
    use axum::http::header::{AUTHORIZATION, RETRY_AFTER};
    use axum::http::HeaderMap;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    async fn upstream() -> String {
        let app = Router::new().route(
            "/entities/{entity_id}/{resource}",
            get(
                |Path((entity_id, resource)): Path<(String, String)>,
                 headers: HeaderMap| async move {
                    let authorized = headers
                        .get(AUTHORIZATION)
                        .is_some_and(|v| v == "Bearer tok");
                    match (entity_id.as_str(), resource.as_str()) {
                        _ if !authorized => StatusCode::UNAUTHORIZED.into_response(),
                        ("E1", "roles") => Json(json!([{"id": "r1"}])).into_response(),
                        ("E1", "slow") => {
                            (StatusCode::TOO_MANY_REQUESTS, [(RETRY_AFTER, "600")]).into_response()
                        }
                        ("E1", "flaky") => StatusCode::BAD_GATEWAY.into_response(),
                        _ => StatusCode::NOT_FOUND.into_response(),
                    }
                },
            ),
        );
        spawn_server(app).await
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let source = HttpUpstreamSource::new(upstream().await, Some("tok".to_string()));
        let value = source.fetch("E1", "roles").await.unwrap();
        assert_eq!(value, json!([{"id": "r1"}]));
    }

    #[tokio::test]
    async fn test_error_classification() {
        let source = HttpUpstreamSource::new(upstream().await, Some("tok".to_string()));

        assert_eq!(
            source.fetch("E1", "slow").await.unwrap_err(),
            RemoteError::Throttled {
                retry_after: Duration::from_secs(600)
            }
        );
        assert!(matches!(
            source.fetch("E1", "flaky").await.unwrap_err(),
            RemoteError::Transient(_)
        ));
        assert!(matches!(
            source.fetch("E2", "roles").await.unwrap_err(),
            RemoteError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_token_is_permanent() {
        let source = HttpUpstreamSource::new(upstream().await, None);
        assert!(matches!(
            source.fetch("E1", "roles").await.unwrap_err(),
            RemoteError::Permanent(_)
        ));
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(
            parse_retry_after(Some(&HeaderValue::from_static("120"))),
            Some(Duration::from_secs(120))
        );
        assert_eq!(
            parse_retry_after(Some(&HeaderValue::from_static("1.5"))),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(
            parse_retry_after(Some(&HeaderValue::from_static("Wed, 21 Oct 2026 07:28:00 GMT"))),
            None
        );
        assert_eq!(parse_retry_after(None), None);
    }
}
