//! HTTP handlers for resource CRUD and like routes
//!
//! Every handler follows the same pipeline: authorize the operation, talk to
//! the store, project the records through the resource's visibility policy.

use super::payload::{EntityPayload, UploadedFile};
use crate::core::auth::Operation;
use crate::core::cascade::CascadeReport;
use crate::core::entity::EntityRecord;
use crate::core::error::ApiError;
use crate::core::file::FileRef;
use crate::core::likes::LikeToggle;
use crate::core::pagination::{PageEnvelope, PageParams};
use crate::core::validation::{parse_id, parse_liked};
use crate::server::entity_registry::ResourceHandle;
use crate::server::host::ServerHost;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// State shared by the routes of one resource
#[derive(Clone)]
pub struct ResourceState {
    pub host: Arc<ServerHost>,
    pub resource: Arc<ResourceHandle>,
}

/// State of the like route, only mounted for resources that can be liked
#[derive(Clone)]
pub struct LikeState {
    pub resource: ResourceState,
    pub likes: Arc<LikeToggle>,
}

/// `GET /{plural}`
pub async fn list_entities(
    State(state): State<ResourceState>,
    headers: HeaderMap,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<PageEnvelope<Value>>, ApiError> {
    let ResourceState { host, resource } = state;
    host.authorize(&headers, &resource, Operation::List).await?;

    let params = PageParams::from_query(&raw, host.config.default_limit);
    let (total, records) = match &params.query {
        Some(query) => (
            resource.store.count_search(query).await?,
            resource.store.search(query, params.window).await?,
        ),
        None => (
            resource.store.count(&params.filter).await?,
            resource.store.find(params.window, &params.filter).await?,
        ),
    };

    let data = records.iter().map(|r| resource.project(r)).collect();
    Ok(Json(resource.paginator.envelope(params.window, total, data)))
}

/// `GET /{plural}/{id}`
pub async fn get_entity(
    State(state): State<ResourceState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let ResourceState { host, resource } = state;
    host.authorize(&headers, &resource, Operation::Get).await?;

    let id = parse_id(resource.entity_type(), &id)?;
    let record = resource
        .store
        .find_one(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(resource.entity_type(), id))?;

    Ok(Json(resource.project(&record)))
}

/// `POST /{plural}`
pub async fn create_entity(
    State(state): State<ResourceState>,
    headers: HeaderMap,
    payload: EntityPayload,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let ResourceState { host, resource } = state;
    host.authorize(&headers, &resource, Operation::Create).await?;

    resource
        .rules
        .validate(&with_file_fields(&payload), Operation::Create)?;

    let EntityPayload { mut fields, files } = payload;
    let uploaded = attach_files(&host, files, &mut fields, None).await?;

    let record = match resource.store.create(fields).await {
        Ok(record) => record,
        Err(e) => {
            discard_uploads(&host, &uploaded).await;
            return Err(e.into());
        }
    };
    tracing::info!(resource = resource.entity_type(), id = %record.id, "created");

    Ok((StatusCode::CREATED, Json(resource.project(&record))))
}

/// `PUT /{plural}/{id}`
pub async fn update_entity(
    State(state): State<ResourceState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: EntityPayload,
) -> Result<Json<Value>, ApiError> {
    let ResourceState { host, resource } = state;
    host.authorize(&headers, &resource, Operation::Update).await?;

    let id = parse_id(resource.entity_type(), &id)?;
    resource
        .rules
        .validate(&with_file_fields(&payload), Operation::Update)?;

    let current = resource
        .store
        .find_one(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(resource.entity_type(), id))?;

    let EntityPayload { mut fields, files } = payload;
    let uploaded = attach_files(&host, files, &mut fields, Some(&current)).await?;

    let record = match resource.store.update(&id, fields).await {
        Ok(Some(record)) => record,
        outcome => {
            discard_uploads(&host, &uploaded).await;
            return Err(match outcome {
                Err(e) => e.into(),
                Ok(_) => ApiError::not_found(resource.entity_type(), id),
            });
        }
    };

    Ok(Json(resource.project(&record)))
}

/// `DELETE /{plural}/{id}`
pub async fn delete_entity(
    State(state): State<ResourceState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<CascadeReport>, ApiError> {
    let ResourceState { host, resource } = state;
    host.authorize(&headers, &resource, Operation::Delete).await?;

    let id = parse_id(resource.entity_type(), &id)?;
    let report = resource
        .cascade
        .run(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(resource.entity_type(), id))?;

    Ok(Json(report))
}

/// `PUT /{plural}/{id}/like/{user_id}` with body `{"liked": bool}`
pub async fn toggle_like(
    State(state): State<LikeState>,
    headers: HeaderMap,
    Path((id, user_id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let LikeState {
        resource: ResourceState { host, resource },
        likes,
    } = state;
    host.authorize(&headers, &resource, Operation::Like).await?;

    let id = parse_id(resource.entity_type(), &id)?;
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let liked = parse_liked(resource.entity_type(), &body)?;

    let record = likes
        .toggle(&id, &user_id, liked)
        .await?
        .ok_or_else(|| ApiError::not_found(resource.entity_type(), id))?;

    Ok(Json(resource.project(&record)))
}

// Fields about to receive uploads count as present for validation
fn with_file_fields(payload: &EntityPayload) -> Map<String, Value> {
    let mut fields = payload.fields.clone();
    for field in payload.file_fields() {
        fields
            .entry(field.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
    }
    fields
}

/// Store uploaded files and reference them from `fields`
///
/// Files are appended to whatever the field already holds on `current`.
/// Returns the stored files. When one upload fails, the ones before it are
/// removed again.
async fn attach_files(
    host: &ServerHost,
    files: Vec<UploadedFile>,
    fields: &mut Map<String, Value>,
    current: Option<&EntityRecord>,
) -> Result<Vec<FileRef>, ApiError> {
    let mut uploaded = Vec::with_capacity(files.len());
    for file in files {
        let stored = match host.files.upload(&file.name, &file.mime, file.bytes).await {
            Ok(stored) => stored,
            Err(e) => {
                discard_uploads(host, &uploaded).await;
                return Err(e.into());
            }
        };

        let existing = fields
            .get(&file.field)
            .or_else(|| current.and_then(|record| record.get(&file.field)))
            .cloned();
        let mut refs = match existing {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(single) => vec![single],
        };
        refs.push(stored.to_value());
        fields.insert(file.field, Value::Array(refs));
        uploaded.push(stored);
    }
    Ok(uploaded)
}

// Best-effort removal of files no record ended up referencing
async fn discard_uploads(host: &ServerHost, uploaded: &[FileRef]) {
    for file in uploaded {
        if let Err(e) = host.files.remove(file).await {
            tracing::warn!(file = %file.id, error = %e, "failed to discard upload");
        }
    }
}
