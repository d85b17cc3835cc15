use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tenantsync_infrastructure::ConfigService;
use tenantsync_infrastructure::storage::SecretStorage;
use tenantsync_server::logging::init_logging;
use tenantsync_server::{AppBootstrap, router};

#[derive(Parser, Debug)]
#[command(name = "tenantsyncd", version, about = "Tenant configuration sync server")]
struct Args {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, short = 'c', env = "TENANTSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Socket address to bind, overrides the config file
    #[arg(long)]
    bind: Option<String>,

    /// Path to secret.json (defaults to the platform config directory)
    #[arg(long)]
    secrets: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_service = ConfigService::new(args.config.as_deref())?;
    let mut config = config_service.get_config()?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    let _log_guard = init_logging(&args.log_level, config.server.log_dir.as_deref())?;
    tracing::info!(
        "[Main] Loaded configuration from {}",
        config_service.path().display()
    );

    let secret_storage = match args.secrets {
        Some(path) => SecretStorage::with_path(path),
        None => SecretStorage::new()?,
    };
    let secrets = secret_storage
        .load_with_env()
        .with_context(|| format!("failed to load {}", secret_storage.path().display()))?;

    let bootstrap = AppBootstrap::build(&config, &secrets).await?;
    let app = router(Arc::new(bootstrap.app_state));

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    tracing::info!("[Main] Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("[Main] Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("[Main] Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
