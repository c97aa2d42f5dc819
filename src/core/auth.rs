//! Authorization system
//!
//! Identity is an external collaborator: an [`AuthProvider`] turns request
//! headers into an [`AuthContext`]. Each resource operation is guarded by an
//! [`AuthPolicy`] read from configuration.

use crate::core::error::ApiError;
use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

/// Authorization context extracted from a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthContext {
    /// Authenticated user
    User { user_id: String, roles: Vec<String> },

    /// System administrator
    Admin { admin_id: String },

    /// No authentication (public access)
    Anonymous,
}

impl AuthContext {
    /// Check if context represents an admin
    pub fn is_admin(&self) -> bool {
        matches!(self, AuthContext::Admin { .. })
    }

    /// Get user_id if available
    pub fn user_id(&self) -> Option<&str> {
        match self {
            AuthContext::User { user_id, .. } => Some(user_id),
            AuthContext::Admin { admin_id } => Some(admin_id),
            AuthContext::Anonymous => None,
        }
    }
}

/// Resource operations that can be guarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
    Like,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::List => "list",
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Like => "like",
        };
        f.write_str(name)
    }
}

/// Authorization policy for an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Public access (no auth required)
    Public,

    /// Any authenticated user
    Authenticated,

    /// User must have one of these roles
    HasRole(Vec<String>),

    /// Admin only
    AdminOnly,

    /// Combination of policies (AND)
    And(Vec<AuthPolicy>),

    /// Combination of policies (OR)
    Or(Vec<AuthPolicy>),
}

impl AuthPolicy {
    /// Check if auth context satisfies this policy
    pub fn check(&self, context: &AuthContext) -> bool {
        match self {
            AuthPolicy::Public => true,

            AuthPolicy::Authenticated => !matches!(context, AuthContext::Anonymous),

            AuthPolicy::HasRole(required_roles) => match context {
                AuthContext::User { roles, .. } => required_roles.iter().any(|r| roles.contains(r)),
                AuthContext::Admin { .. } => true,
                AuthContext::Anonymous => false,
            },

            AuthPolicy::AdminOnly => context.is_admin(),

            AuthPolicy::And(policies) => policies.iter().all(|p| p.check(context)),

            AuthPolicy::Or(policies) => policies.iter().any(|p| p.check(context)),
        }
    }

    /// Parse policy from string (for YAML config)
    ///
    /// Unknown strings fall back to `authenticated`. Configuration loading
    /// rejects them beforehand through [`AuthPolicy::try_parse`].
    pub fn parse_policy(s: &str) -> Self {
        Self::try_parse(s).unwrap_or(AuthPolicy::Authenticated)
    }

    /// Strict parse: `public`, `authenticated`, `admin_only` or `role:a|b`
    /// with at least one role
    pub fn try_parse(s: &str) -> Option<Self> {
        match s.trim() {
            "public" => Some(AuthPolicy::Public),
            "authenticated" => Some(AuthPolicy::Authenticated),
            "admin_only" => Some(AuthPolicy::AdminOnly),
            s => {
                let roles: Vec<String> = s
                    .strip_prefix("role:")?
                    .split('|')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(String::from)
                    .collect();
                (!roles.is_empty()).then_some(AuthPolicy::HasRole(roles))
            }
        }
    }

    /// Fail with `Forbidden` when the context does not satisfy the policy
    pub fn enforce(&self, context: &AuthContext) -> Result<(), ApiError> {
        if self.check(context) {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

/// Extract the token of an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Trait for auth providers
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve the caller of a request
    ///
    /// No credentials yields `Anonymous`. Credentials that cannot be
    /// verified yield `ApiError::Unauthorized`.
    async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext, ApiError>;
}

/// Default no-auth provider (for development)
pub struct NoAuthProvider;

#[async_trait]
impl AuthProvider for NoAuthProvider {
    async fn authenticate(&self, _headers: &HeaderMap) -> Result<AuthContext, ApiError> {
        Ok(AuthContext::Anonymous)
    }
}

/// Bearer-token provider backed by a fixed token table
///
/// Token issuance lives elsewhere. Only tokens registered here are accepted.
#[derive(Default)]
pub struct StaticTokenAuthProvider {
    tokens: RwLock<HashMap<String, AuthContext>>,
}

impl StaticTokenAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token for a user with the given roles
    pub fn with_user(self, token: &str, user_id: &str, roles: &[&str]) -> Self {
        self.insert(
            token,
            AuthContext::User {
                user_id: user_id.to_string(),
                roles: roles.iter().map(|r| r.to_string()).collect(),
            },
        );
        self
    }

    /// Register a token for an administrator
    pub fn with_admin(self, token: &str, admin_id: &str) -> Self {
        self.insert(
            token,
            AuthContext::Admin {
                admin_id: admin_id.to_string(),
            },
        );
        self
    }

    pub fn insert(&self, token: &str, context: AuthContext) {
        // Poisoning leaves the map intact
        let mut tokens = self.tokens.write().unwrap_or_else(|e| e.into_inner());
        tokens.insert(token.to_string(), context);
    }
}

#[async_trait]
impl AuthProvider for StaticTokenAuthProvider {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext, ApiError> {
        let Some(token) = bearer_token(headers) else {
            return Ok(AuthContext::Anonymous);
        };

        let tokens = self.tokens.read().unwrap_or_else(|e| e.into_inner());
        tokens
            .get(token)
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Invalid token".to_string()))
    }
}
