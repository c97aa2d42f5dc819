//! Entity record: the structurally-typed unit handled by every store
//!
//! Records carry a small set of managed fields (`id`, `entity_type`,
//! timestamps) and an arbitrary JSON object of user fields. The user fields
//! are flattened into the serialized form, so a record serializes exactly
//! like the object a client sent plus the managed fields.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Field names owned by the store. They are ignored when present in a payload.
pub const MANAGED_FIELDS: &[&str] = &["id", "entity_type", "created_at", "updated_at"];

/// Exact-match filter built from query parameters (`field -> raw value`)
pub type Filter = BTreeMap<String, String>;

/// A persisted record (post, reply, user...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Unique identifier
    pub id: Uuid,

    /// Entity type name (singular, e.g. "post")
    pub entity_type: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,

    /// User-defined fields, flattened on the wire
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl EntityRecord {
    /// Create a new record with a fresh id and timestamps
    pub fn new(entity_type: impl Into<String>, fields: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            entity_type: entity_type.into(),
            created_at: now,
            updated_at: now,
            fields: without_managed_fields(fields),
        }
    }

    /// Get a user field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Assign every non-managed key of `patch` and bump `updated_at`
    pub fn merge(&mut self, patch: Map<String, Value>) {
        for (key, value) in without_managed_fields(patch) {
            self.fields.insert(key, value);
        }
        self.touch();
    }

    /// Update the modification timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Full (unsanitized) JSON projection
    pub fn to_json(&self) -> Value {
        let mut object = Map::with_capacity(self.fields.len() + MANAGED_FIELDS.len());
        object.insert("id".to_string(), Value::String(self.id.to_string()));
        object.insert(
            "entity_type".to_string(),
            Value::String(self.entity_type.clone()),
        );
        object.insert(
            "created_at".to_string(),
            Value::String(self.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        );
        object.insert(
            "updated_at".to_string(),
            Value::String(self.updated_at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        );
        for (key, value) in &self.fields {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object)
    }

    /// Check every filter entry against the record
    ///
    /// Query strings only carry text, so values are compared through their
    /// textual form. A relation stored as `{"id": ...}` matches on its id.
    pub fn matches(&self, filter: &Filter) -> bool {
        filter.iter().all(|(field, expected)| {
            if field == "id" {
                return self.id.to_string() == *expected;
            }
            self.fields
                .get(field)
                .is_some_and(|value| value_matches(value, expected))
        })
    }

    /// Case-insensitive substring search over every string or number value
    pub fn contains_text(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.fields
            .values()
            .any(|value| value_contains(value, &needle))
    }
}

fn without_managed_fields(mut fields: Map<String, Value>) -> Map<String, Value> {
    for key in MANAGED_FIELDS {
        fields.remove(*key);
    }
    fields
}

fn value_matches(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s == expected,
        Value::Number(n) => n.to_string() == expected,
        Value::Bool(b) => b.to_string() == expected,
        Value::Object(map) => map
            .get("id")
            .is_some_and(|id| value_matches(id, expected)),
        _ => false,
    }
}

fn value_contains(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s.to_lowercase().contains(needle),
        Value::Number(n) => n.to_string().contains(needle),
        Value::Array(items) => items.iter().any(|v| value_contains(v, needle)),
        Value::Object(map) => map.values().any(|v| value_contains(v, needle)),
        _ => false,
    }
}
