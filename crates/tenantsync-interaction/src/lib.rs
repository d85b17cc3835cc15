//! Outbound HTTP adapters for tenantsync.
//!
//! - [`HttpAgentNotifier`]: change notifications to the live agent
//! - [`HttpUpstreamSource`]: single-shot reads from the throttled upstream API
//! - [`HttpConfigClient`]: the configuration API as seen by a remote session

pub mod http_config_client;
pub mod http_notifier;
pub mod upstream_client;

pub use http_config_client::{ACTOR_HEADER, CleanupSummary, HttpConfigClient};
pub use http_notifier::HttpAgentNotifier;
pub use upstream_client::HttpUpstreamSource;

#[cfg(test)]
pub(crate) mod test_support {
    use axum::Router;

    /// Serves `app` on an ephemeral local port and returns its base URL.
    pub async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }
}
