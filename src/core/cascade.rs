//! Delete-with-cascade orchestration
//!
//! The primary record is deleted first. Its attachments are then removed
//! from file storage and its child records deleted from their own store, one
//! step at a time. A failing step is logged and recorded; the remaining steps
//! still run. The outcome is a [`CascadeReport`] whose message does not
//! depend on the failures.

use crate::core::entity::EntityRecord;
use crate::core::file::{FileRef, attachment_entries};
use crate::core::service::{EntityStore, FileStorage};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Kind of cascade step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeStep {
    Attachment,
    Child,
}

/// A cascade step that did not complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeFailure {
    pub step: CascadeStep,
    /// File id or child record reference
    pub target: String,
    pub reason: String,
}

/// Result of a delete-with-cascade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeReport {
    pub message: String,
    pub id: Uuid,
    #[serde(default)]
    pub failures: Vec<CascadeFailure>,
}

impl CascadeReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Child records stored under a field of the parent
#[derive(Clone)]
pub struct ChildStore {
    /// Field of the parent holding the child references
    pub field: String,
    pub store: Arc<dyn EntityStore>,
}

/// Delete-with-cascade for one resource
#[derive(Clone)]
pub struct CascadeDelete {
    resource: String,
    store: Arc<dyn EntityStore>,
    files: Arc<dyn FileStorage>,
    attachments_field: Option<String>,
    children: Vec<ChildStore>,
}

impl CascadeDelete {
    /// `resource` is the plural name used in the confirmation message
    pub fn new(
        resource: impl Into<String>,
        store: Arc<dyn EntityStore>,
        files: Arc<dyn FileStorage>,
    ) -> Self {
        Self {
            resource: resource.into(),
            store,
            files,
            attachments_field: None,
            children: Vec::new(),
        }
    }

    pub fn with_attachments(mut self, field: impl Into<String>) -> Self {
        self.attachments_field = Some(field.into());
        self
    }

    pub fn with_child(mut self, field: impl Into<String>, store: Arc<dyn EntityStore>) -> Self {
        self.children.push(ChildStore {
            field: field.into(),
            store,
        });
        self
    }

    /// Confirmation message returned for every successful primary delete
    pub fn message(&self) -> String {
        format!(
            "{} and all its attachments and replies have been deleted",
            self.resource
        )
    }

    /// Delete `id` and everything attached to it
    ///
    /// Returns `Ok(None)` when the record does not exist. Only a failure of
    /// the primary delete is an error.
    pub async fn run(&self, id: &Uuid) -> Result<Option<CascadeReport>> {
        let Some(record) = self.store.delete(id).await? else {
            return Ok(None);
        };

        let mut failures = Vec::new();
        self.remove_attachments(&record, &mut failures).await;
        self.delete_children(&record, &mut failures).await;

        if failures.is_empty() {
            tracing::info!(resource = %self.resource, %id, "deleted with cascade");
        } else {
            tracing::warn!(
                resource = %self.resource,
                %id,
                failures = failures.len(),
                "deleted with incomplete cascade"
            );
        }

        Ok(Some(CascadeReport {
            message: self.message(),
            id: *id,
            failures,
        }))
    }

    async fn remove_attachments(&self, record: &EntityRecord, failures: &mut Vec<CascadeFailure>) {
        let Some(value) = self.attachments_field.as_deref().and_then(|f| record.get(f)) else {
            return;
        };

        for entry in attachment_entries(value) {
            let file = match FileRef::from_value(entry) {
                Ok(file) => file,
                Err(e) => {
                    let target = match entry.get("id") {
                        Some(Value::String(id)) => id.clone(),
                        Some(id) => id.to_string(),
                        None => entry.to_string(),
                    };
                    tracing::warn!(%target, error = %e, "unreadable attachment");
                    failures.push(CascadeFailure {
                        step: CascadeStep::Attachment,
                        target,
                        reason: format!("invalid file reference: {}", e),
                    });
                    continue;
                }
            };

            if let Err(e) = self.files.remove(&file).await {
                tracing::warn!(file = %file.id, error = %e, "failed to remove attachment");
                failures.push(CascadeFailure {
                    step: CascadeStep::Attachment,
                    target: file.id.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    async fn delete_children(&self, record: &EntityRecord, failures: &mut Vec<CascadeFailure>) {
        for child in &self.children {
            let references = match record.get(&child.field) {
                Some(Value::Array(items)) => items.clone(),
                Some(Value::Null) | None => continue,
                Some(single) => vec![single.clone()],
            };

            for reference in references {
                let Some(child_id) = child_reference(&reference) else {
                    tracing::warn!(field = %child.field, %reference, "unreadable child reference");
                    failures.push(CascadeFailure {
                        step: CascadeStep::Child,
                        target: reference.to_string(),
                        reason: "invalid child reference".to_string(),
                    });
                    continue;
                };

                match child.store.delete(&child_id).await {
                    Ok(Some(_)) => {}
                    Ok(None) => tracing::debug!(child = %child_id, "child already gone"),
                    Err(e) => {
                        tracing::warn!(child = %child_id, error = %e, "failed to delete child");
                        failures.push(CascadeFailure {
                            step: CascadeStep::Child,
                            target: child_id.to_string(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
    }
}

// A child is referenced either by its id or by an object carrying it
fn child_reference(value: &Value) -> Option<Uuid> {
    match value {
        Value::String(s) => Uuid::parse_str(s).ok(),
        Value::Object(map) => map.get("id").and_then(child_reference),
        _ => None,
    }
}
