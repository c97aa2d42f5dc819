//! Collaborator traits for persistence and file storage
//!
//! The framework never talks to a database or a disk directly. Every handler
//! goes through these traits, so any backend can be plugged in through the
//! [`ServerBuilder`](crate::server::ServerBuilder).

use crate::core::entity::{EntityRecord, Filter};
use crate::core::file::FileRef;
use crate::core::pagination::PageWindow;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Persistence for one entity type
///
/// `find`/`search` do the slicing; callers only compute the window.
/// Missing records are reported as `Ok(None)`, not as errors.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Get a record by id
    async fn find_one(&self, id: &Uuid) -> Result<Option<EntityRecord>>;

    /// Records matching `filter`, restricted to `window`
    async fn find(&self, window: PageWindow, filter: &Filter) -> Result<Vec<EntityRecord>>;

    /// Records matching the full-text `query`, restricted to `window`
    async fn search(&self, query: &str, window: PageWindow) -> Result<Vec<EntityRecord>>;

    /// Number of records matching `filter`
    async fn count(&self, filter: &Filter) -> Result<usize>;

    /// Number of records matching the full-text `query`
    async fn count_search(&self, query: &str) -> Result<usize>;

    /// Insert a record built from `fields`
    async fn create(&self, fields: Map<String, Value>) -> Result<EntityRecord>;

    /// Merge `fields` into an existing record
    async fn update(&self, id: &Uuid, fields: Map<String, Value>) -> Result<Option<EntityRecord>>;

    /// Remove a record, returning what was removed
    async fn delete(&self, id: &Uuid) -> Result<Option<EntityRecord>>;
}

/// Storage for uploaded files
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store a file and return the reference to embed in an entity
    async fn upload(&self, name: &str, mime: &str, bytes: Vec<u8>) -> Result<FileRef>;

    /// Remove a stored file
    async fn remove(&self, file: &FileRef) -> Result<()>;
}
