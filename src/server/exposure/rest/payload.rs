//! Request body extractor for create and update
//!
//! Accepts either a JSON object or a `multipart/form-data` body carrying
//! the JSON object in a `data` part and files in `files.<field>` parts.

use crate::core::error::ApiError;
use axum::Json;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header;
use serde_json::{Map, Value};

/// Prefix of multipart parts holding files
pub const FILES_PREFIX: &str = "files.";

/// A file received in a multipart body, not yet stored
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Entity field the file belongs to
    pub field: String,
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Entity fields plus any files sent with them
#[derive(Debug, Clone, Default)]
pub struct EntityPayload {
    pub fields: Map<String, Value>,
    pub files: Vec<UploadedFile>,
}

impl EntityPayload {
    /// Distinct entity fields receiving files, in arrival order
    pub fn file_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        for file in &self.files {
            if !fields.contains(&file.field.as_str()) {
                fields.push(&file.field);
            }
        }
        fields
    }

    fn from_json(value: Value) -> Result<Self, ApiError> {
        match value {
            Value::Object(fields) => Ok(Self {
                fields,
                files: Vec::new(),
            }),
            _ => Err(ApiError::BadRequest(
                "Request body must be a JSON object".to_string(),
            )),
        }
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut payload = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == "data" {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                let value: Value = serde_json::from_str(&text)
                    .map_err(|e| ApiError::BadRequest(format!("Invalid data part: {}", e)))?;
                payload.fields = Self::from_json(value)?.fields;
            } else if let Some(target) = name.strip_prefix(FILES_PREFIX) {
                if target.is_empty() {
                    return Err(ApiError::BadRequest(format!(
                        "File part '{}' names no field",
                        name
                    )));
                }
                let file_name = field.file_name().unwrap_or(target).to_string();
                let mime = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;

                payload.files.push(UploadedFile {
                    field: target.to_string(),
                    name: file_name,
                    mime,
                    bytes: bytes.to_vec(),
                });
            } else {
                tracing::debug!(part = %name, "ignoring multipart part");
            }
        }

        Ok(payload)
    }
}

impl<S> FromRequest<S> for EntityPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            Self::from_multipart(multipart).await
        } else {
            let Json(value) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            Self::from_json(value)
        }
    }
}
