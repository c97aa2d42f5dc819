//! Server host: the explicit application context
//!
//! The host owns configuration, resources and the injected collaborators
//! (persistence, file storage, identity). It is built once by the
//! [`ServerBuilder`](super::ServerBuilder) and shared by every handler, so
//! nothing in the crate reaches for global state.

use crate::config::ApiConfig;
use crate::core::auth::{AuthContext, AuthProvider, Operation};
use crate::core::error::ApiError;
use crate::core::service::{EntityStore, FileStorage};
use crate::server::entity_registry::{EntityRegistry, ResourceHandle};
use anyhow::Result;
use axum::http::HeaderMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Host context containing all application state
pub struct ServerHost {
    /// Validated configuration
    pub config: Arc<ApiConfig>,

    /// Resources served by the API
    pub registry: EntityRegistry,

    /// File storage for attachments
    pub files: Arc<dyn FileStorage>,

    /// Identity collaborator
    pub auth: Arc<dyn AuthProvider>,
}

impl ServerHost {
    /// Build the host from builder components
    ///
    /// `stores` is keyed by singular resource name and must cover every
    /// configured resource.
    pub fn from_builder_components(
        config: ApiConfig,
        stores: HashMap<String, Arc<dyn EntityStore>>,
        files: Arc<dyn FileStorage>,
        auth: Arc<dyn AuthProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let registry = EntityRegistry::from_config(&config, &stores, files.clone())?;

        Ok(Self {
            config: Arc::new(config),
            registry,
            files,
            auth,
        })
    }

    /// Get entity types registered in the host
    pub fn entity_types(&self) -> Vec<&str> {
        self.registry.entity_types()
    }

    /// Get a resource by singular name
    pub fn resource(&self, entity_type: &str) -> Option<&Arc<ResourceHandle>> {
        self.registry.get(entity_type)
    }

    /// Identify the caller and check the resource policy for `operation`
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        resource: &ResourceHandle,
        operation: Operation,
    ) -> Result<AuthContext, ApiError> {
        let context = self.auth.authenticate(headers).await?;
        if let Err(e) = resource.policy(operation).enforce(&context) {
            tracing::debug!(
                resource = resource.entity_type(),
                %operation,
                user = context.user_id().unwrap_or("anonymous"),
                "access denied"
            );
            return Err(e);
        }
        Ok(context)
    }
}
