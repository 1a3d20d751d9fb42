use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::repositories::errors::repository_errors::RepositoryError;

/// Longest identifier accepted for any stored document.
pub const MAX_ID_LENGTH: usize = 128;

/// Returns true when `id` matches `^[A-Za-z0-9._-]{1,128}$`.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LENGTH
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

/// A stored JSON document together with the version the store last reported for it.
///
/// Values are never updated in place: every repository operation hands back a
/// fresh `Entity` carrying the latest etag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default)]
    pub metadata: EntityMetadata,
}

impl Entity {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Entity {
            id: id.into(),
            data,
            etag: None,
            metadata: EntityMetadata::default(),
        }
    }

    pub fn with_etag(self, etag: Option<String>) -> Self {
        Entity { etag, ..self }
    }

    pub fn with_metadata(self, metadata: EntityMetadata) -> Self {
        Entity { metadata, ..self }
    }
}

/// Version information for a document, obtained without reading its body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub etag: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

/// One page of a listing. `next_cursor` is absent once the listing is exhausted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Serializes a domain value as the payload of the document `id`.
pub fn to_entity<T: Serialize>(id: &str, value: &T) -> Result<Entity, RepositoryError> {
    Ok(Entity::new(id, serde_json::to_value(value)?))
}

/// A typed domain value paired with the etag of the document it was read from
/// or written to.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub etag: Option<String>,
}

impl<T: DeserializeOwned> Versioned<T> {
    pub fn from_entity(entity: Entity) -> Result<Self, RepositoryError> {
        Ok(Versioned {
            value: serde_json::from_value(entity.data)?,
            etag: entity.etag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_ids() {
        assert!(is_valid_id("a"));
        assert!(is_valid_id("user-1.backup_2"));
        assert!(is_valid_id(&"x".repeat(MAX_ID_LENGTH)));
    }

    #[test]
    fn test_invalid_ids() {
        assert!(!is_valid_id(""));
        assert!(!is_valid_id(&"x".repeat(MAX_ID_LENGTH + 1)));
        assert!(!is_valid_id("has space"));
        assert!(!is_valid_id("slash/inside"));
        assert!(!is_valid_id("ünicode"));
    }

    #[test]
    fn test_with_etag_returns_new_value() {
        let entity = Entity::new("a", json!({"x": 1}));
        let tagged = entity.clone().with_etag(Some("e1".to_string()));

        assert_eq!(entity.etag, None);
        assert_eq!(tagged.etag.as_deref(), Some("e1"));
        assert_eq!(tagged.data, entity.data);
    }

    #[test]
    fn test_entity_serialization_omits_missing_fields() {
        let entity = Entity::new("a", json!({"x": 1}));
        let serialized = serde_json::to_value(&entity).unwrap();

        assert_eq!(serialized, json!({"id": "a", "data": {"x": 1}, "metadata": {}}));
    }

    #[test]
    fn test_versioned_from_entity() {
        let entity = Entity::new("a", json!([1, 2])).with_etag(Some("e1".to_string()));
        let versioned: Versioned<Vec<u8>> = Versioned::from_entity(entity).unwrap();

        assert_eq!(versioned.value, vec![1, 2]);
        assert_eq!(versioned.etag.as_deref(), Some("e1"));
    }

    #[test]
    fn test_versioned_from_mismatched_entity() {
        let entity = Entity::new("a", json!("text"));
        let result: Result<Versioned<Vec<u8>>, _> = Versioned::from_entity(entity);
        assert!(matches!(result, Err(RepositoryError::Serialization(_))));
    }
}
