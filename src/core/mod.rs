//! Core module containing the reusable request pipeline pieces
//!
//! Sanitizer, paginator, cascade delete and like toggle, plus the traits
//! the server uses to reach persistence, file storage and identity.

pub mod auth;
pub mod cascade;
pub mod entity;
pub mod error;
pub mod file;
pub mod likes;
pub mod pagination;
pub mod sanitize;
pub mod service;
pub mod validation;

pub use auth::{AuthContext, AuthPolicy, AuthProvider, NoAuthProvider, Operation, StaticTokenAuthProvider};
pub use cascade::{CascadeDelete, CascadeFailure, CascadeReport, CascadeStep};
pub use entity::{EntityRecord, Filter};
pub use error::{ApiError, ErrorResponse, FieldMessage};
pub use file::FileRef;
pub use likes::LikeToggle;
pub use pagination::{PageEnvelope, PageParams, PageWindow, Paginator};
pub use sanitize::{DenyList, VisibilityPolicy, sanitize};
pub use service::{EntityStore, FileStorage};
pub use validation::PayloadRules;
