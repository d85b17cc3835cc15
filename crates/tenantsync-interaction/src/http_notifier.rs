//! HttpAgentNotifier - pushes change events to the live agent process.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tenantsync_core::error::{Result, TenantSyncError};
use tenantsync_core::propagation::{Notifier, PropagationEvent};

/// POSTs each [`PropagationEvent`] as JSON to the agent's notify endpoint.
///
/// The shared secret, when configured, travels as a bearer token. Any
/// non-2xx answer counts as a failed delivery.
#[derive(Clone)]
pub struct HttpAgentNotifier {
    client: Client,
    url: String,
    secret: Option<String>,
    timeout: Duration,
}

impl HttpAgentNotifier {
    pub fn new(url: impl Into<String>, secret: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            secret,
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for HttpAgentNotifier {
    async fn notify(&self, event: &PropagationEvent) -> Result<()> {
        let mut request = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(event);
        if let Some(secret) = &self.secret {
            request = request.bearer_auth(secret);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TenantSyncError::propagation(format!("Agent unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TenantSyncError::propagation(format!(
                "Agent answered {} for {}/{}",
                status, event.entity_id, event.section
            )));
        }

        tracing::debug!(
            "[HttpAgentNotifier] Agent acknowledged {}/{}",
            event.entity_id,
            event.section
        );
        Ok(())
    }
}
