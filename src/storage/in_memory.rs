//! In-memory implementations of EntityStore and FileStorage for testing and development

use crate::core::entity::{EntityRecord, Filter};
use crate::core::file::FileRef;
use crate::core::pagination::PageWindow;
use crate::core::service::{EntityStore, FileStorage};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// In-memory entity store
///
/// Records are kept in insertion order. Uses RwLock for thread-safe access.
#[derive(Clone)]
pub struct InMemoryEntityStore {
    entity_type: String,
    records: Arc<RwLock<IndexMap<Uuid, EntityRecord>>>,
}

impl InMemoryEntityStore {
    /// Create an empty store for `entity_type`
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            records: Arc::new(RwLock::new(IndexMap::new())),
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, IndexMap<Uuid, EntityRecord>>> {
        self.records
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, IndexMap<Uuid, EntityRecord>>> {
        self.records
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn find_one(&self, id: &Uuid) -> Result<Option<EntityRecord>> {
        Ok(self.read()?.get(id).cloned())
    }

    async fn find(&self, window: PageWindow, filter: &Filter) -> Result<Vec<EntityRecord>> {
        let records = self.read()?;
        Ok(window.apply(records.values().filter(|r| r.matches(filter)).cloned()))
    }

    async fn search(&self, query: &str, window: PageWindow) -> Result<Vec<EntityRecord>> {
        let records = self.read()?;
        Ok(window.apply(records.values().filter(|r| r.contains_text(query)).cloned()))
    }

    async fn count(&self, filter: &Filter) -> Result<usize> {
        Ok(self.read()?.values().filter(|r| r.matches(filter)).count())
    }

    async fn count_search(&self, query: &str) -> Result<usize> {
        Ok(self
            .read()?
            .values()
            .filter(|r| r.contains_text(query))
            .count())
    }

    async fn create(&self, fields: Map<String, Value>) -> Result<EntityRecord> {
        let record = EntityRecord::new(self.entity_type.clone(), fields);
        self.write()?.insert(record.id, record.clone());
        tracing::debug!(entity_type = %self.entity_type, id = %record.id, "record created");
        Ok(record)
    }

    async fn update(&self, id: &Uuid, fields: Map<String, Value>) -> Result<Option<EntityRecord>> {
        let mut records = self.write()?;
        let Some(record) = records.get_mut(id) else {
            return Ok(None);
        };
        record.merge(fields);
        tracing::debug!(entity_type = %self.entity_type, %id, "record updated");
        Ok(Some(record.clone()))
    }

    async fn delete(&self, id: &Uuid) -> Result<Option<EntityRecord>> {
        let removed = self.write()?.shift_remove(id);
        if removed.is_some() {
            tracing::debug!(entity_type = %self.entity_type, %id, "record deleted");
        }
        Ok(removed)
    }
}

/// A file kept by [`InMemoryFileStorage`]
#[derive(Debug, Clone)]
struct StoredFile {
    file: FileRef,
    bytes: Vec<u8>,
}

/// In-memory file storage
///
/// URLs are built as `{base_url}/{hash}{ext}` without serving anything.
#[derive(Clone)]
pub struct InMemoryFileStorage {
    base_url: String,
    files: Arc<RwLock<HashMap<Uuid, StoredFile>>>,
}

impl InMemoryFileStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            files: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Whether a file is currently stored
    pub fn contains(&self, id: &Uuid) -> bool {
        self.files.read().map(|f| f.contains_key(id)).unwrap_or(false)
    }

    /// Content of a stored file
    pub fn bytes(&self, id: &Uuid) -> Option<Vec<u8>> {
        self.files
            .read()
            .ok()
            .and_then(|f| f.get(id).map(|stored| stored.bytes.clone()))
    }

    pub fn len(&self) -> usize {
        self.files.read().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl FileStorage for InMemoryFileStorage {
    async fn upload(&self, name: &str, mime: &str, bytes: Vec<u8>) -> Result<FileRef> {
        let id = Uuid::new_v4();
        let hash = id.simple().to_string();
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();

        let file = FileRef {
            id,
            name: name.to_string(),
            url: format!("{}/{}{}", self.base_url, hash, ext),
            mime: mime.to_string(),
            size: bytes.len() as f64,
            hash,
            ext,
        };

        let mut files = self
            .files
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        files.insert(
            id,
            StoredFile {
                file: file.clone(),
                bytes,
            },
        );
        tracing::debug!(%id, name, "file uploaded");

        Ok(file)
    }

    async fn remove(&self, file: &FileRef) -> Result<()> {
        let mut files = self
            .files
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let stored = files
            .remove(&file.id)
            .ok_or_else(|| anyhow!("File {} not found", file.id))?;
        tracing::debug!(id = %stored.file.id, name = %stored.file.name, "file removed");

        Ok(())
    }
}
