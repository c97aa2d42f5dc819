//! Reusable field validators
//!
//! A validator receives the field name and its value (`Value::Null` when the
//! field is absent) and returns a human-readable message on failure.

use serde_json::Value;

/// Validator: field is required (present and not null)
pub fn required() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| {
        if value.is_null() {
            Err(format!("{} is required", field))
        } else {
            Ok(())
        }
    }
}

/// Validator: value must be a boolean
pub fn boolean() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| {
        if value.is_boolean() {
            Ok(())
        } else {
            Err(format!("{} must be a boolean", field))
        }
    }
}
