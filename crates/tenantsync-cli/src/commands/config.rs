use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tenantsync_application::{EditSession, SessionOptions};
use tenantsync_core::client::ConfigClient;
use tenantsync_interaction::HttpConfigClient;

use super::print_json;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub async fn get(client: &HttpConfigClient, entity_id: &str, section: Option<&str>) -> Result<()> {
    let entity = client.read_entity(entity_id).await?;
    match section {
        Some(name) => match entity.section(name) {
            Some(value) => print_json(value),
            None => bail!("{} has no section '{}'", entity_id, name),
        },
        None => print_json(&entity),
    }
}

/// Applies the patches through an edit session. They coalesce into one
/// debounced write, or go out one write per patch with `now`.
pub async fn set(
    client: HttpConfigClient,
    entity_id: &str,
    section: &str,
    patches: &[String],
    now: bool,
) -> Result<()> {
    let patches = parse_patches(patches)?;

    let options = if now {
        SessionOptions::default().flush_immediately(&[section])
    } else {
        SessionOptions::default()
    };
    let quiet_period = options.quiet_period;
    let client: Arc<dyn ConfigClient> = Arc::new(client);
    let session = EditSession::new(entity_id, client, options)?;
    session.load().await?;

    let count = patches.len();
    for patch in patches {
        session.update_section(section, patch).await?;
    }

    if !now {
        // Let the debounced commit fire on its own.
        let deadline = tokio::time::Instant::now() + quiet_period * 2;
        while session.is_dirty() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
    if session.is_dirty() {
        // Surfaces the commit error instead of exiting with edits unsaved.
        session.flush().await?;
    }
    tracing::debug!("[cli] {} edit(s) committed to {}/{}", count, entity_id, section);

    match session.section(section) {
        Some(value) => print_json(&value),
        None => Ok(()),
    }
}

fn parse_patches(raw: &[String]) -> Result<Vec<Value>> {
    raw.iter()
        .map(|raw| {
            let value: Value =
                serde_json::from_str(raw).with_context(|| format!("invalid JSON: {}", raw))?;
            if !value.is_object() {
                bail!("patch must be a JSON object: {}", raw);
            }
            Ok(value)
        })
        .collect()
}

pub async fn delete(client: &HttpConfigClient, entity_id: &str, must_exist: bool) -> Result<()> {
    client.delete_entity(entity_id, must_exist).await?;
    println!("Deleted {}", entity_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_patches() {
        let patches =
            parse_patches(&[r#"{"enabled":true}"#.to_string(), r#"{"maxActions":5}"#.to_string()])
                .unwrap();
        assert_eq!(patches, vec![json!({"enabled": true}), json!({"maxActions": 5})]);
    }

    #[test]
    fn test_parse_patches_rejects_non_objects() {
        assert!(parse_patches(&["[1,2]".to_string()]).is_err());
        assert!(parse_patches(&["{oops".to_string()]).is_err());
    }
}
