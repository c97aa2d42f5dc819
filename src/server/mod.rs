//! Server module for building HTTP servers from configuration
//!
//! This module provides a `ServerBuilder` that registers, for every
//! configured resource, the CRUD routes and (when enabled) the like route.

pub mod builder;
pub mod entity_registry;
pub mod exposure;
pub mod host;

pub use builder::ServerBuilder;
pub use entity_registry::{EntityRegistry, ResourceHandle};
pub use exposure::RestExposure;
pub use host::ServerHost;
