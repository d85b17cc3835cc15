use std::sync::Arc;

use anyhow::{Context, Result};
use tenantsync_application::{
    BackupManager, CachedFetcher, ConfigUseCase, PropagationDispatcher, RetryPolicy,
    VersionedStore,
};
use tenantsync_core::config::{RootConfig, SecretConfig};
use tenantsync_core::propagation::{NoopNotifier, Notifier};
use tenantsync_core::upstream::UpstreamSource;
use tenantsync_infrastructure::{FileBackupRepository, FileConfigRepository, TenantSyncPaths};
use tenantsync_interaction::{HttpAgentNotifier, HttpUpstreamSource};

use crate::app::AppState;

/// Composition root: wires repositories, use cases and outbound adapters
/// from the loaded configuration.
pub struct AppBootstrap {
    pub app_state: AppState,
}

impl AppBootstrap {
    pub async fn build(config: &RootConfig, secrets: &SecretConfig) -> Result<Self> {
        let paths = TenantSyncPaths::new(config.store.data_dir.as_deref())
            .context("Failed to resolve data directory")?;
        tracing::info!(
            "[Bootstrap] Data directory: {}",
            paths.data_dir().display()
        );

        // 1. Storage
        let entities = FileConfigRepository::new(paths.data_dir())
            .await
            .context("Failed to open entity storage")?;
        let snapshots = FileBackupRepository::new(paths.data_dir())
            .await
            .context("Failed to open backup storage")?;
        let store = Arc::new(VersionedStore::new(Arc::new(entities)));
        let backups = Arc::new(BackupManager::new(store.clone(), Arc::new(snapshots)));

        // 2. Propagation
        let notifier: Arc<dyn Notifier> = match &config.notifier.url {
            Some(url) => {
                tracing::info!("[Bootstrap] Agent notifications go to {}", url);
                if secrets.notify_secret.is_none() {
                    tracing::warn!(
                        "[Bootstrap] No notify secret configured; agent calls are unauthenticated"
                    );
                }
                Arc::new(HttpAgentNotifier::new(
                    url.clone(),
                    secrets.notify_secret.clone(),
                    config.notifier.timeout(),
                ))
            }
            None => {
                tracing::info!(
                    "[Bootstrap] No notifier URL configured; agent notifications disabled"
                );
                Arc::new(NoopNotifier)
            }
        };
        let dispatcher = PropagationDispatcher::new(notifier, config.notifier.timeout());

        let config_usecase = Arc::new(ConfigUseCase::new(
            store,
            backups,
            dispatcher,
            config.backup.capture_before_sections.iter().cloned(),
        ));

        // 3. Upstream reads
        let upstream: Option<Arc<dyn UpstreamSource>> =
            config.upstream.base_url.as_ref().map(|base_url| {
                tracing::info!("[Bootstrap] Upstream API at {}", base_url);
                Arc::new(HttpUpstreamSource::new(
                    base_url.clone(),
                    secrets.upstream_token.clone(),
                )) as Arc<dyn UpstreamSource>
            });
        let upstream_fetcher = Arc::new(
            CachedFetcher::new(config.cache.ttl(), RetryPolicy::from(&config.cache))
                .with_max_stale(config.cache.max_stale()),
        );

        Ok(Self {
            app_state: AppState {
                config_usecase,
                upstream,
                upstream_fetcher,
                retention_days: config.backup.retention_days,
            },
        })
    }
}
