use serde_json::Value;
use std::sync::Arc;
use tenantsync_application::{CachedFetcher, ConfigUseCase};
use tenantsync_core::upstream::UpstreamSource;

/// Application state shared across request handlers.
pub struct AppState {
    pub config_usecase: Arc<ConfigUseCase>,
    /// `None` when no upstream base URL is configured.
    pub upstream: Option<Arc<dyn UpstreamSource>>,
    /// Process-wide cache in front of `upstream`.
    pub upstream_fetcher: Arc<CachedFetcher<Value>>,
    /// Default age threshold for the cleanup action.
    pub retention_days: u32,
}

pub type SharedState = Arc<AppState>;
