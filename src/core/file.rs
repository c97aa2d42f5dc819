//! File references stored on entities (attachments)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Metadata of a stored file, as embedded in an entity field
///
/// Only `id`, `name`, `url` and `mime` survive sanitization. The rest is
/// storage metadata listed in the default deny-list. `size` may be
/// fractional (kilobytes as written by some upload clients).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub mime: String,
    #[serde(default)]
    pub size: f64,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub ext: String,
}

impl FileRef {
    /// Read a file reference from an attachment value
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "url": self.url,
            "mime": self.mime,
            "size": self.size,
            "hash": self.hash,
            "ext": self.ext,
        })
    }
}

/// Entries held by an attachments field
///
/// The field may hold a single entry or an array of them. Nulls are not
/// entries.
pub fn attachment_entries(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().filter(|v| !v.is_null()).collect(),
        Value::Null => Vec::new(),
        single => vec![single],
    }
}
