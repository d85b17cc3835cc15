//! Built-in section map for entities that have never been written.

use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Section names every tenant starts with.
pub const DEFAULT_SECTION_NAMES: [&str; 4] = ["moderation", "logging", "welcome", "admins"];

/// Returns the default section map.
pub fn default_sections() -> BTreeMap<String, Value> {
    let mut sections = BTreeMap::new();
    sections.insert("moderation".to_string(), json!({ "enabled": false }));
    sections.insert(
        "logging".to_string(),
        json!({ "enabled": false, "channelId": null }),
    );
    sections.insert(
        "welcome".to_string(),
        json!({ "enabled": false, "channelId": null, "message": "Welcome, {user}!" }),
    );
    sections.insert("admins".to_string(), json!({ "users": [] }));
    sections
}
