use anyhow::Result;
use tenantsync_interaction::HttpConfigClient;

use super::print_json;

pub async fn list(client: &HttpConfigClient, entity_id: &str) -> Result<()> {
    let backups = client.list_backups(entity_id).await?;
    if backups.is_empty() {
        println!("No backups for {}", entity_id);
        return Ok(());
    }
    for backup in backups {
        println!(
            "{}  {}  {:>8} B  {}",
            backup.captured_at.to_rfc3339(),
            backup.reason,
            backup.size_bytes,
            backup.backup_id
        );
    }
    Ok(())
}

pub async fn show(client: &HttpConfigClient, entity_id: &str, backup_id: &str) -> Result<()> {
    let record = client.get_backup(entity_id, backup_id).await?;
    print_json(&record)
}

pub async fn create(
    client: &HttpConfigClient,
    entity_id: &str,
    reason: Option<&str>,
) -> Result<()> {
    let backup = client.create_backup(entity_id, reason).await?;
    println!("Created {}", backup.backup_id);
    Ok(())
}

pub async fn restore(client: &HttpConfigClient, entity_id: &str, backup_id: &str) -> Result<()> {
    let entity = client.restore_backup(entity_id, backup_id).await?;
    println!("Restored {} from {}", entity.entity_id, backup_id);
    Ok(())
}

pub async fn cleanup(
    client: &HttpConfigClient,
    entity_id: &str,
    max_age_days: Option<u32>,
) -> Result<()> {
    let summary = client.cleanup_backups(entity_id, max_age_days).await?;
    println!("Removed {} snapshot(s)", summary.removed);
    for backup_id in summary.deleted {
        println!("  {}", backup_id);
    }
    Ok(())
}
