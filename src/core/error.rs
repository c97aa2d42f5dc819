//! Typed error handling for the API
//!
//! Every handler returns `Result<_, ApiError>`. The error knows its HTTP
//! status and renders itself as:
//!
//! ```json
//! {
//!   "code": "VALIDATION_ERROR",
//!   "message": "Validation failed",
//!   "details": { "messages": [ { "id": "...", "message": "...", "field": "text" } ] }
//! }
//! ```
//!
//! Cascade-delete failures are not errors of this type. They are
//! reported inside [`CascadeReport`](crate::core::cascade::CascadeReport).

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// One entry of a validation error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMessage {
    /// Stable message identifier (e.g. `Entity.form.error.text.required`)
    pub id: String,
    /// Human-readable message
    pub message: String,
    /// Offending field, when the message concerns one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl FieldMessage {
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            field: None,
        }
    }

    pub fn for_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// The main error type of the API
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Invalid payload or identifier
    #[error("Validation failed")]
    Validation(Vec<FieldMessage>),

    /// Record absent from the store
    #[error("{entity_type} with id '{id}' not found")]
    NotFound { entity_type: String, id: String },

    /// Malformed request that is not a field validation problem
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Credentials present but not recognised
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller lacks permission for the operation
    #[error("Forbidden")]
    Forbidden,

    /// Persistence or file-storage collaborator failure
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Shorthand for a single-message validation error
    pub fn invalid(field: &str, id: &str, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldMessage::new(id, message).for_field(field)])
    }

    pub fn not_found(entity_type: impl Into<String>, id: impl ToString) -> Self {
        ApiError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Storage(_) | ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::NotFound { .. } => "ENTITY_NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::Storage(_) => "STORAGE_ERROR",
            ApiError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.public_message(),
            details: self.details(),
        }
    }

    // Collaborator errors may carry connection strings or paths
    fn public_message(&self) -> String {
        match self {
            ApiError::Storage(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::Validation(messages) => Some(serde_json::json!({ "messages": messages })),
            ApiError::NotFound { entity_type, id } => Some(serde_json::json!({
                "entity_type": entity_type,
                "id": id,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(self.to_response())).into_response()
    }
}
