//! # postapi
//!
//! A posts-and-replies REST API built on a small reusable core:
//!
//! - **Entity Sanitizer**: strips internal fields from every response, at
//!   every nesting depth, through a declarative [`VisibilityPolicy`](core::VisibilityPolicy)
//! - **Paginator**: `_start`/`_limit` windows answered with a
//!   `{count, next, previous, data}` envelope
//! - **Delete with cascade**: removes a record, its attachments and its
//!   child records, reporting every step that failed
//! - **Like toggle**: idempotent set membership guarded by a per-record lock
//!
//! Persistence, file storage and identity are collaborators reached through
//! traits ([`EntityStore`](core::EntityStore), [`FileStorage`](core::FileStorage),
//! [`AuthProvider`](core::AuthProvider)), injected through the
//! [`ServerBuilder`](server::ServerBuilder).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use postapi::prelude::*;
//!
//! let app = ServerBuilder::new()
//!     .with_config(ApiConfig::from_yaml_file("postapi.yaml")?)
//!     .with_auth_provider(StaticTokenAuthProvider::new().with_user("secret", "1", &[]))
//!     .build()?;
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:1337").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        auth::{
            AuthContext, AuthPolicy, AuthProvider, NoAuthProvider, Operation,
            StaticTokenAuthProvider,
        },
        cascade::{CascadeDelete, CascadeFailure, CascadeReport},
        entity::{EntityRecord, Filter},
        error::{ApiError, FieldMessage},
        file::FileRef,
        likes::LikeToggle,
        pagination::{PageEnvelope, PageParams, PageWindow, Paginator},
        sanitize::{DenyList, VisibilityPolicy, sanitize},
        service::{EntityStore, FileStorage},
    };

    // === Storage ===
    pub use crate::storage::{InMemoryEntityStore, InMemoryFileStorage};

    // === Config ===
    pub use crate::config::{ApiConfig, ChildRelation, EntityAuthConfig, ResourceConfig};

    // === Server ===
    pub use crate::server::{RestExposure, ServerBuilder, ServerHost};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde_json::{Map, Value};
    pub use uuid::Uuid;
}
