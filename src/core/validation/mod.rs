//! Payload and identifier validation
//!
//! Resources declare their required fields in configuration. Payloads are
//! checked before they reach the store and every failing field is reported
//! at once.

pub mod validators;

use crate::core::auth::Operation;
use crate::core::error::{ApiError, FieldMessage};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Validation rules of one resource
#[derive(Debug, Clone, Default)]
pub struct PayloadRules {
    entity_type: String,
    required: Vec<String>,
}

impl PayloadRules {
    pub fn new(entity_type: impl Into<String>, required: Vec<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            required,
        }
    }

    /// Check a payload for `operation`
    ///
    /// On create every required field must be present and non-null. On
    /// update only the fields being written are checked, so a required
    /// field cannot be cleared.
    pub fn validate(&self, payload: &Map<String, Value>, operation: Operation) -> Result<(), ApiError> {
        let required = validators::required();

        let messages: Vec<FieldMessage> = self
            .required
            .iter()
            .filter(|field| operation != Operation::Update || payload.contains_key(field.as_str()))
            .filter_map(|field| {
                let value = payload.get(field).unwrap_or(&Value::Null);
                required(field, value).err().map(|message| {
                    FieldMessage::new(
                        format!("{}.form.error.{}.required", self.entity_type, field),
                        message,
                    )
                    .for_field(field.clone())
                })
            })
            .collect();

        if messages.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(messages))
        }
    }
}

/// Parse a path segment as a record id
pub fn parse_id(entity_type: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        ApiError::invalid(
            "id",
            &format!("{}.form.error.id.invalid", entity_type),
            format!("'{}' is not a valid id", raw),
        )
    })
}

/// Read the `liked` flag of a like-toggle body
pub fn parse_liked(entity_type: &str, body: &Value) -> Result<bool, ApiError> {
    let liked = body.get("liked").unwrap_or(&Value::Null);
    validators::boolean()("liked", liked).map_err(|message| {
        ApiError::invalid(
            "liked",
            &format!("{}.form.error.liked.invalid", entity_type),
            message,
        )
    })?;
    Ok(liked.as_bool().unwrap_or_default())
}
