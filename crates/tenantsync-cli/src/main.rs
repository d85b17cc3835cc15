use anyhow::Result;
use clap::{Parser, Subcommand};
use tenantsync_interaction::HttpConfigClient;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "tenantsync")]
#[command(
    about = "tenantsync CLI - read, edit and snapshot tenant configuration",
    long_about = None
)]
struct Cli {
    /// Base URL of the tenantsyncd server
    #[arg(long, global = true, env = "TENANTSYNC_URL", default_value = "http://127.0.0.1:8787")]
    server: String,

    /// Acting identity sent with every request
    #[arg(long, global = true, env = "TENANTSYNC_ACTOR", default_value = "cli")]
    actor: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print an entity, or one of its sections
    Get {
        entity_id: String,
        #[arg(long)]
        section: Option<String>,
    },
    /// Apply one or more partial edits to a section
    Set {
        entity_id: String,
        section: String,
        /// JSON objects, applied in order and written once
        #[arg(required = true)]
        patches: Vec<String>,
        /// Write each edit as soon as it is applied
        #[arg(long)]
        now: bool,
    },
    /// Delete an entity (a pre-delete snapshot is kept)
    Delete {
        entity_id: String,
        /// Fail if the entity was never written
        #[arg(long)]
        must_exist: bool,
    },
    /// Manage snapshots
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },
}

#[derive(Subcommand)]
enum BackupAction {
    /// List snapshots of an entity, newest first
    List { entity_id: String },
    /// Print one snapshot including its payload
    Show { entity_id: String, backup_id: String },
    /// Snapshot the entity's current contents
    Create {
        entity_id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Overwrite the entity with a snapshot
    Restore { entity_id: String, backup_id: String },
    /// Delete snapshots older than the retention window
    Cleanup {
        entity_id: String,
        #[arg(long)]
        max_age_days: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = HttpConfigClient::new(cli.server, cli.actor);

    match cli.command {
        Commands::Get { entity_id, section } => {
            commands::config::get(&client, &entity_id, section.as_deref()).await?
        }
        Commands::Set {
            entity_id,
            section,
            patches,
            now,
        } => commands::config::set(client, &entity_id, &section, &patches, now).await?,
        Commands::Delete {
            entity_id,
            must_exist,
        } => commands::config::delete(&client, &entity_id, must_exist).await?,
        Commands::Backup { action } => match action {
            BackupAction::List { entity_id } => commands::backup::list(&client, &entity_id).await?,
            BackupAction::Show {
                entity_id,
                backup_id,
            } => commands::backup::show(&client, &entity_id, &backup_id).await?,
            BackupAction::Create { entity_id, reason } => {
                commands::backup::create(&client, &entity_id, reason.as_deref()).await?
            }
            BackupAction::Restore {
                entity_id,
                backup_id,
            } => commands::backup::restore(&client, &entity_id, &backup_id).await?,
            BackupAction::Cleanup {
                entity_id,
                max_age_days,
            } => commands::backup::cleanup(&client, &entity_id, max_age_days).await?,
        },
    }

    Ok(())
}
