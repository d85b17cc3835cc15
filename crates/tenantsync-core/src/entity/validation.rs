//! Identifier validation shared by every entry point.
//!
//! Ids end up as file names, so only a conservative alphabet is accepted.

use crate::error::{Result, TenantSyncError};

const MAX_ID_LEN: usize = 64;

/// Validates a tenant identifier.
pub fn validate_entity_id(entity_id: &str) -> Result<()> {
    validate_token("entityId", entity_id)
}

/// Validates a section name.
pub fn validate_section_name(section: &str) -> Result<()> {
    validate_token("section", section)
}

fn validate_token(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(TenantSyncError::missing(field));
    }
    if value.len() > MAX_ID_LEN {
        return Err(TenantSyncError::validation(
            field,
            format!("must be at most {} characters", MAX_ID_LEN),
        ));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(TenantSyncError::validation(
            field,
            "may only contain ASCII letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_snowflake_and_slug() {
        assert!(validate_entity_id("123456789012345678").is_ok());
        assert!(validate_section_name("auto-mod_v2").is_ok());
    }

    #[test]
    fn test_rejects_empty_with_field_name() {
        match validate_entity_id("") {
            Err(TenantSyncError::Validation { field, .. }) => assert_eq!(field, "entityId"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_path_traversal() {
        assert!(validate_entity_id("../etc").is_err());
        assert!(validate_section_name("a/b").is_err());
    }

    #[test]
    fn test_rejects_too_long() {
        let long = "a".repeat(MAX_ID_LEN + 1);
        assert!(validate_entity_id(&long).is_err());
    }
}
