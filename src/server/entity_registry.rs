//! Entity registry: one fully wired [`ResourceHandle`] per configured resource

use crate::config::{ApiConfig, ResourceConfig};
use crate::core::auth::{AuthPolicy, Operation};
use crate::core::cascade::CascadeDelete;
use crate::core::entity::EntityRecord;
use crate::core::likes::LikeToggle;
use crate::core::pagination::Paginator;
use crate::core::sanitize::VisibilityPolicy;
use crate::core::service::{EntityStore, FileStorage};
use crate::core::validation::PayloadRules;
use anyhow::{Result, anyhow};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Everything the handlers need to serve one resource
pub struct ResourceHandle {
    pub config: ResourceConfig,
    pub store: Arc<dyn EntityStore>,
    pub visibility: VisibilityPolicy,
    pub paginator: Paginator,
    pub rules: PayloadRules,
    pub cascade: CascadeDelete,
    /// Present when the resource exposes the like route
    pub likes: Option<Arc<LikeToggle>>,
}

impl ResourceHandle {
    /// The entity type name (singular, e.g., "post")
    pub fn entity_type(&self) -> &str {
        &self.config.singular
    }

    /// The plural form (e.g., "posts")
    pub fn plural(&self) -> &str {
        &self.config.plural
    }

    pub fn policy(&self, operation: Operation) -> AuthPolicy {
        self.config.auth.policy_for(operation)
    }

    /// Public projection of a record
    pub fn project(&self, record: &EntityRecord) -> Value {
        self.visibility.apply(&record.to_json())
    }
}

/// Registry for all resources in the application
///
/// Resources keep their configuration order, which is also the order their
/// routes are mounted in.
#[derive(Default)]
pub struct EntityRegistry {
    resources: IndexMap<String, Arc<ResourceHandle>>,
}

impl EntityRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            resources: IndexMap::new(),
        }
    }

    /// Wire every configured resource to its store
    ///
    /// `stores` is keyed by singular name and must hold a store for every
    /// resource, children included.
    pub fn from_config(
        config: &ApiConfig,
        stores: &HashMap<String, Arc<dyn EntityStore>>,
        files: Arc<dyn FileStorage>,
    ) -> Result<Self> {
        let store_for = |singular: &str| {
            stores
                .get(singular)
                .cloned()
                .ok_or_else(|| anyhow!("No store registered for '{}'", singular))
        };

        let mut registry = Self::new();
        for resource in &config.resources {
            let store = store_for(&resource.singular)?;

            let mut cascade = CascadeDelete::new(&resource.plural, store.clone(), files.clone());
            if let Some(field) = &resource.attachments_field {
                cascade = cascade.with_attachments(field);
            }
            for child in &resource.children {
                cascade = cascade.with_child(&child.field, store_for(&child.resource)?);
            }

            let handle = ResourceHandle {
                visibility: resource.visibility(),
                paginator: Paginator::new(&config.base_url, &resource.plural),
                rules: PayloadRules::new(&resource.singular, resource.required_fields.clone()),
                likes: resource
                    .likes
                    .then(|| Arc::new(LikeToggle::new(store.clone()))),
                cascade,
                store,
                config: resource.clone(),
            };
            registry.register(handle);
        }

        Ok(registry)
    }

    /// Register a resource
    ///
    /// The singular name is used as the key; registering it again replaces
    /// the previous handle.
    pub fn register(&mut self, handle: ResourceHandle) {
        let entity_type = handle.entity_type().to_string();
        self.resources.insert(entity_type, Arc::new(handle));
    }

    /// Get a resource by singular name
    pub fn get(&self, entity_type: &str) -> Option<&Arc<ResourceHandle>> {
        self.resources.get(entity_type)
    }

    /// Get a resource by plural (route) name
    pub fn get_by_plural(&self, plural: &str) -> Option<&Arc<ResourceHandle>> {
        self.resources.values().find(|r| r.plural() == plural)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResourceHandle>> {
        self.resources.values()
    }

    /// Get all registered entity types
    pub fn entity_types(&self) -> Vec<&str> {
        self.resources.keys().map(|s| s.as_str()).collect()
    }
}
