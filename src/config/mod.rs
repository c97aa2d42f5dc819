//! Configuration loading and management

use crate::core::auth::{AuthContext, AuthPolicy, Operation};
use crate::core::error::ApiError;
use crate::core::pagination::DEFAULT_LIMIT;
use crate::core::sanitize::{DenyList, VisibilityPolicy};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;

/// Environment variable naming the YAML configuration file
pub const CONFIG_ENV: &str = "POSTAPI_CONFIG";
/// Environment variable overriding `server_addr`
pub const ADDR_ENV: &str = "POSTAPI_ADDR";
/// Environment variable overriding `base_url`
pub const BASE_URL_ENV: &str = "POSTAPI_BASE_URL";

/// Authorization policies of a resource, one per operation
///
/// Values use the [`AuthPolicy::parse_policy`] syntax: "public",
/// "authenticated", "role:editor", "admin_only".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityAuthConfig {
    #[serde(default = "default_auth_policy")]
    pub list: String,
    #[serde(default = "default_auth_policy")]
    pub get: String,
    #[serde(default = "default_auth_policy")]
    pub create: String,
    #[serde(default = "default_auth_policy")]
    pub update: String,
    #[serde(default = "default_auth_policy")]
    pub delete: String,
    #[serde(default = "default_auth_policy")]
    pub like: String,
}

fn default_auth_policy() -> String {
    "authenticated".to_string()
}

impl Default for EntityAuthConfig {
    fn default() -> Self {
        Self {
            list: default_auth_policy(),
            get: default_auth_policy(),
            create: default_auth_policy(),
            update: default_auth_policy(),
            delete: default_auth_policy(),
            like: default_auth_policy(),
        }
    }
}

impl EntityAuthConfig {
    pub fn policy_for(&self, operation: Operation) -> AuthPolicy {
        AuthPolicy::parse_policy(self.raw(operation))
    }

    fn raw(&self, operation: Operation) -> &str {
        match operation {
            Operation::List => &self.list,
            Operation::Get => &self.get,
            Operation::Create => &self.create,
            Operation::Update => &self.update,
            Operation::Delete => &self.delete,
            Operation::Like => &self.like,
        }
    }

    /// Reject policy strings that would silently mean `authenticated`
    pub fn validate(&self) -> std::result::Result<(), String> {
        const OPERATIONS: [Operation; 6] = [
            Operation::List,
            Operation::Get,
            Operation::Create,
            Operation::Update,
            Operation::Delete,
            Operation::Like,
        ];
        for operation in OPERATIONS {
            let raw = self.raw(operation);
            if AuthPolicy::try_parse(raw).is_none() {
                return Err(format!("unknown {} policy '{}'", operation, raw));
            }
        }
        Ok(())
    }
}

/// Child records deleted along with their parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildRelation {
    /// Field of the parent holding child references
    pub field: String,
    /// Singular name of the child resource
    pub resource: String,
}

/// Configuration of one exposed resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Singular form (e.g., "post", "reply")
    pub singular: String,

    /// Plural form, used as route segment (e.g., "posts", "replies")
    pub plural: String,

    /// Fields hidden from responses; the entity default list when absent
    #[serde(default)]
    pub deny_list: Option<DenyList>,

    /// Per-field visibility overrides
    #[serde(default)]
    pub nested: BTreeMap<String, VisibilityPolicy>,

    #[serde(default)]
    pub required_fields: Vec<String>,

    /// Field holding file references removed on delete
    #[serde(default)]
    pub attachments_field: Option<String>,

    #[serde(default)]
    pub children: Vec<ChildRelation>,

    /// Expose the like toggle route
    #[serde(default)]
    pub likes: bool,

    #[serde(default)]
    pub auth: EntityAuthConfig,
}

impl ResourceConfig {
    /// Resource with default visibility and no extras
    pub fn new(singular: &str, plural: &str) -> Self {
        Self {
            singular: singular.to_string(),
            plural: plural.to_string(),
            deny_list: None,
            nested: BTreeMap::new(),
            required_fields: Vec::new(),
            attachments_field: None,
            children: Vec::new(),
            likes: false,
            auth: EntityAuthConfig::default(),
        }
    }

    /// Visibility policy applied to every record leaving the service
    pub fn visibility(&self) -> VisibilityPolicy {
        VisibilityPolicy {
            deny: self
                .deny_list
                .clone()
                .unwrap_or_else(DenyList::entity_defaults),
            nested: self.nested.clone(),
        }
    }
}

/// A bearer token accepted by the development auth provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub token: String,
    pub user_id: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub admin: bool,
}

impl TokenConfig {
    pub fn context(&self) -> AuthContext {
        if self.admin {
            AuthContext::Admin {
                admin_id: self.user_id.clone(),
            }
        } else {
            AuthContext::User {
                user_id: self.user_id.clone(),
                roles: self.roles.clone(),
            }
        }
    }
}

fn default_server_addr() -> String {
    "127.0.0.1:1337".to_string()
}

fn default_base_url() -> String {
    "http://localhost:1337".to_string()
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

/// Complete configuration of the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Listen address
    #[serde(default = "default_server_addr")]
    pub server_addr: String,

    /// Public origin used to build pagination links
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Page size when `_limit` is absent or unusable
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    pub resources: Vec<ResourceConfig>,

    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

impl ApiConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Load the file named by `POSTAPI_CONFIG` (or the defaults), then apply
    /// the environment overrides and validate
    pub fn load() -> Result<Self> {
        let config = match std::env::var(CONFIG_ENV) {
            Ok(path) => {
                tracing::info!(path = %path, "loading configuration");
                Self::from_yaml_file(&path)?
            }
            Err(_) => Self::default_config(),
        };
        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `POSTAPI_ADDR` and `POSTAPI_BASE_URL`
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(addr) = lookup(ADDR_ENV) {
            self.server_addr = addr;
        }
        if let Some(base_url) = lookup(BASE_URL_ENV) {
            self.base_url = base_url;
        }
        self
    }

    /// Check internal consistency
    pub fn validate(&self) -> std::result::Result<(), ApiError> {
        self.server_addr.parse::<SocketAddr>().map_err(|e| {
            ApiError::Config(format!("invalid server_addr '{}': {}", self.server_addr, e))
        })?;

        if self.default_limit == 0 {
            return Err(ApiError::Config("default_limit must be at least 1".into()));
        }

        let mut singulars = HashSet::new();
        let mut plurals = HashSet::new();
        for resource in &self.resources {
            if resource.singular.is_empty() || resource.plural.is_empty() {
                return Err(ApiError::Config("resource names cannot be empty".into()));
            }
            if !singulars.insert(resource.singular.as_str()) {
                return Err(ApiError::Config(format!(
                    "duplicate resource '{}'",
                    resource.singular
                )));
            }
            if !plurals.insert(resource.plural.as_str()) {
                return Err(ApiError::Config(format!(
                    "duplicate route '/{}'",
                    resource.plural
                )));
            }
            resource.auth.validate().map_err(|e| {
                ApiError::Config(format!("'{}': {}", resource.singular, e))
            })?;
        }

        for resource in &self.resources {
            for child in &resource.children {
                if self.find_resource(&child.resource).is_none() {
                    return Err(ApiError::Config(format!(
                        "'{}' cascades to unknown resource '{}'",
                        resource.singular, child.resource
                    )));
                }
            }
        }

        Ok(())
    }

    /// Find a resource by its singular name
    pub fn find_resource(&self, singular: &str) -> Option<&ResourceConfig> {
        self.resources.iter().find(|r| r.singular == singular)
    }

    /// Find a resource by its plural (route) name
    pub fn find_by_plural(&self, plural: &str) -> Option<&ResourceConfig> {
        self.resources.iter().find(|r| r.plural == plural)
    }

    /// Posts and replies, both requiring `text` and cascading to replies
    ///
    /// Authors embedded in either also hide the user deny-list.
    pub fn default_config() -> Self {
        let resource = |singular: &str, plural: &str| ResourceConfig {
            nested: BTreeMap::from([(
                "author".to_string(),
                VisibilityPolicy::uniform(DenyList::user_defaults()),
            )]),
            required_fields: vec!["text".to_string()],
            attachments_field: Some("attachments".to_string()),
            children: vec![ChildRelation {
                field: "replies".to_string(),
                resource: "reply".to_string(),
            }],
            likes: true,
            ..ResourceConfig::new(singular, plural)
        };

        Self {
            server_addr: default_server_addr(),
            base_url: default_base_url(),
            default_limit: DEFAULT_LIMIT,
            resources: vec![resource("post", "posts"), resource("reply", "replies")],
            tokens: Vec::new(),
        }
    }
}
