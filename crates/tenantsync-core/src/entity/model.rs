//! Config entity domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::defaults::default_sections;

/// The configuration record for one tenant.
///
/// Sections are opaque JSON documents keyed by name. A write to one section
/// never touches its siblings; the whole record is persisted at once so a
/// failed write leaves the previous record intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntity {
    /// Opaque stable tenant identifier.
    pub entity_id: String,
    /// Named, independently updatable sub-documents.
    pub sections: BTreeMap<String, Value>,
    /// Time of the last committed write. `None` until the first write.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Actor responsible for the last committed write.
    #[serde(default)]
    pub updated_by: Option<String>,
}

impl ConfigEntity {
    /// Materializes an entity holding the built-in default sections.
    ///
    /// Nothing is persisted; the record only becomes durable on first write.
    pub fn with_defaults(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            sections: default_sections(),
            updated_at: None,
            updated_by: None,
        }
    }

    /// Returns a section value, if present.
    pub fn section(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }

    /// Replaces exactly one section and stamps the write.
    ///
    /// `updated_at` strictly advances: if the clock reads at or before the
    /// previous stamp, the new stamp is one millisecond past it.
    pub fn apply_section(
        &mut self,
        name: impl Into<String>,
        value: Value,
        actor: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        self.sections.insert(name.into(), value);
        self.stamp(actor, now);
    }

    /// Stamps the entity without changing sections.
    pub fn stamp(&mut self, actor: impl Into<String>, now: DateTime<Utc>) {
        let next = match self.updated_at {
            Some(previous) if now <= previous => previous + chrono::Duration::milliseconds(1),
            _ => now,
        };
        self.updated_at = Some(next);
        self.updated_by = Some(actor.into());
    }
}

/// Shallow merge of `patch` over `base`.
///
/// When both are objects, keys of `patch` replace keys of `base` one level
/// deep and every other key of `base` is kept. Any other combination yields
/// `patch` unchanged.
pub fn merge_shallow(base: &Value, patch: &Value) -> Value {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in patch_map {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        _ => patch.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_with_defaults_is_not_stamped() {
        let entity = ConfigEntity::with_defaults("E1");
        assert_eq!(entity.entity_id, "E1");
        assert!(entity.updated_at.is_none());
        assert!(entity.section("moderation").is_some());
    }

    #[test]
    fn test_apply_section_keeps_siblings() {
        let mut entity = ConfigEntity::with_defaults("E1");
        let logging_before = entity.section("logging").cloned();

        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        entity.apply_section("moderation", json!({"enabled": true}), "alice", now);

        assert_eq!(entity.section("moderation"), Some(&json!({"enabled": true})));
        assert_eq!(entity.section("logging").cloned(), logging_before);
        assert_eq!(entity.updated_by.as_deref(), Some("alice"));
        assert_eq!(entity.updated_at, Some(now));
    }

    #[test]
    fn test_stamp_strictly_advances() {
        let mut entity = ConfigEntity::with_defaults("E1");
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        entity.stamp("a", now);
        entity.stamp("b", now);
        assert_eq!(
            entity.updated_at,
            Some(now + chrono::Duration::milliseconds(1))
        );

        // Clock went backwards
        entity.stamp("c", now - chrono::Duration::seconds(10));
        assert_eq!(
            entity.updated_at,
            Some(now + chrono::Duration::milliseconds(2))
        );
    }

    #[test]
    fn test_merge_shallow_objects() {
        let base = json!({"enabled": true, "nested": {"a": 1}});
        let patch = json!({"maxActions": 5, "nested": {"b": 2}});

        let merged = merge_shallow(&base, &patch);
        assert_eq!(
            merged,
            json!({"enabled": true, "maxActions": 5, "nested": {"b": 2}})
        );
    }

    #[test]
    fn test_merge_shallow_non_object_replaces() {
        assert_eq!(merge_shallow(&json!([1, 2]), &json!([3])), json!([3]));
        assert_eq!(merge_shallow(&json!({"a": 1}), &json!(7)), json!(7));
    }
}
