//! Response sanitization
//!
//! Every entity leaving the service goes through a [`VisibilityPolicy`]
//! which removes internal fields at every nesting depth.
//!
//! Two flavours are provided:
//!
//! - [`sanitize`]: strips the same [`DenyList`] at every level, including
//!   inside nested objects that belong to another entity type (a post's
//!   author, a reply's attachments).
//! - [`VisibilityPolicy`]: the declarative form. A policy is a deny-list plus
//!   optional per-field policies for nested subtrees. A nested policy hides
//!   its own fields on top of every field hidden above it, so a key denied
//!   at the top never reappears deeper down. A policy with no `nested`
//!   entries behaves exactly like [`sanitize`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Fields hidden from posts and replies
pub const DEFAULT_ENTITY_DENY_LIST: &[&str] = &[
    "confirmed",
    "blocked",
    "role",
    "provider",
    "phone",
    "address",
    "wallet_balance",
    "created_at",
    "updated_at",
    "locals",
    "published_at",
    "formats",
    "previewUrl",
    "provider_metadata",
    "alternativeText",
    "caption",
    "hash",
    "width",
    "height",
    "size",
    "ext",
];

/// Fields hidden from user profiles
pub const DEFAULT_USER_DENY_LIST: &[&str] = &[
    "confirmed",
    "blocked",
    "role",
    "provider",
    "phone",
    "address",
    "wallet_balance",
    "created_by",
    "updated_by",
    "locals",
];

/// Ordered set of field names that must never be exposed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DenyList(Vec<String>);

impl DenyList {
    /// Build a deny-list, dropping duplicates while keeping first-seen order
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::default();
        for field in fields {
            list.push(field);
        }
        list
    }

    /// The default list applied to posts and replies
    pub fn entity_defaults() -> Self {
        Self::new(DEFAULT_ENTITY_DENY_LIST.iter().copied())
    }

    /// The default list applied to users
    pub fn user_defaults() -> Self {
        Self::new(DEFAULT_USER_DENY_LIST.iter().copied())
    }

    /// Append a field unless already present
    pub fn push(&mut self, field: impl Into<String>) {
        let field = field.into();
        if !self.contains(&field) {
            self.0.push(field);
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|f| f == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for DenyList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Strip every denied key from `value`, recursing into arrays and objects
///
/// The same deny-list is applied at every depth. The input is left untouched.
pub fn sanitize(value: &Value, deny_list: &DenyList) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !deny_list.contains(key))
                .map(|(key, value)| (key.clone(), sanitize(value, deny_list)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| sanitize(item, deny_list))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Declarative field visibility for one entity type
///
/// ```yaml
/// deny: [created_at, updated_at, hash]
/// nested:
///   author:
///     deny: [email, phone, role]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisibilityPolicy {
    /// Fields removed at this level and below
    #[serde(default)]
    pub deny: DenyList,

    /// Extra restrictions for the subtree under a given field
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub nested: BTreeMap<String, VisibilityPolicy>,
}

impl VisibilityPolicy {
    /// A policy applying `deny` uniformly at every depth
    pub fn uniform(deny: DenyList) -> Self {
        Self {
            deny,
            nested: BTreeMap::new(),
        }
    }

    /// Hide more fields below `field`
    pub fn with_nested(mut self, field: impl Into<String>, policy: VisibilityPolicy) -> Self {
        self.nested.insert(field.into(), policy);
        self
    }

    /// Whether `field` is in this policy's own deny-list
    pub fn is_internal(&self, field: &str) -> bool {
        self.deny.contains(field)
    }

    /// Produce the public projection of `value`
    pub fn apply(&self, value: &Value) -> Value {
        self.apply_within(value, &DenyList::default())
    }

    // `inherited` holds every field denied by the enclosing policies
    fn apply_within(&self, value: &Value, inherited: &DenyList) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .filter(|(key, _)| !self.is_internal(key) && !inherited.contains(key))
                    .map(|(key, value)| {
                        let projected = match self.nested.get(key) {
                            Some(policy) => {
                                let hidden: DenyList =
                                    inherited.iter().chain(self.deny.iter()).collect();
                                policy.apply_within(value, &hidden)
                            }
                            None => self.apply_within(value, inherited),
                        };
                        (key.clone(), projected)
                    })
                    .collect(),
            ),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.apply_within(item, inherited))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_removes_top_level_keys() {
        let deny = DenyList::new(["role", "phone"]);
        let out = sanitize(&json!({"id": 1, "role": "admin", "phone": "555"}), &deny);
        assert_eq!(out, json!({"id": 1}));
    }

    #[test]
    fn test_sanitize_recurses_into_objects_and_arrays() {
        let deny = DenyList::entity_defaults();
        let entity = json!({
            "text": "hello",
            "created_at": "2021-01-01",
            "author": {"username": "abiodun", "wallet_balance": 10, "role": {"id": 1}},
            "attachments": [
                {"url": "/uploads/a.png", "hash": "abc", "size": 12.5, "formats": {}},
                {"url": "/uploads/b.png", "width": 10, "height": 20}
            ]
        });

        let out = sanitize(&entity, &deny);

        assert_eq!(
            out,
            json!({
                "text": "hello",
                "author": {"username": "abiodun"},
                "attachments": [
                    {"url": "/uploads/a.png"},
                    {"url": "/uploads/b.png"}
                ]
            })
        );
    }

    #[test]
    fn test_sanitize_keeps_scalars_in_arrays() {
        let deny = DenyList::new(["hash"]);
        let out = sanitize(&json!({"likes": ["u1", 2, null]}), &deny);
        assert_eq!(out, json!({"likes": ["u1", 2, null]}));
    }

    #[test]
    fn test_sanitize_passes_through_nulls_and_empty() {
        let deny = DenyList::entity_defaults();
        assert_eq!(sanitize(&json!(null), &deny), json!(null));
        assert_eq!(sanitize(&json!({}), &deny), json!({}));
        assert_eq!(sanitize(&json!([]), &deny), json!([]));
        assert_eq!(
            sanitize(&json!({"replies": [], "parent": null}), &deny),
            json!({"replies": [], "parent": null})
        );
    }

    #[test]
    fn test_sanitize_does_not_mutate_input() {
        let deny = DenyList::new(["secret"]);
        let input = json!({"secret": 1, "nested": {"secret": 2}});
        let _ = sanitize(&input, &deny);
        assert_eq!(input, json!({"secret": 1, "nested": {"secret": 2}}));
    }

    #[test]
    fn test_deny_list_deduplicates() {
        let deny = DenyList::new(["a", "b", "a"]);
        assert_eq!(deny.len(), 2);
        assert_eq!(deny.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_uniform_policy_matches_sanitize() {
        let deny = DenyList::entity_defaults();
        let policy = VisibilityPolicy::uniform(deny.clone());
        let entity = json!({
            "text": "x",
            "size": 3,
            "replies": [{"text": "y", "updated_at": "z", "author": {"phone": "1"}}]
        });
        assert_eq!(policy.apply(&entity), sanitize(&entity, &deny));
    }

    #[test]
    fn test_nested_policy_extends_parent_deny_list() {
        let policy = VisibilityPolicy::uniform(DenyList::new(["created_at"]))
            .with_nested("author", VisibilityPolicy::uniform(DenyList::new(["email"])));

        let out = policy.apply(&json!({
            "created_at": "t",
            "email": "kept@post.level",
            "author": {
                "email": "hidden@example.com",
                "created_at": "hidden too",
                "name": "n",
                "avatar": {"email": "x", "created_at": "y", "url": "/a.png"}
            }
        }));

        assert_eq!(
            out,
            json!({
                "email": "kept@post.level",
                "author": {"name": "n", "avatar": {"url": "/a.png"}}
            })
        );
    }

    #[test]
    fn test_deeper_nested_policies_accumulate() {
        let policy = VisibilityPolicy::uniform(DenyList::new(["a"])).with_nested(
            "author",
            VisibilityPolicy::uniform(DenyList::new(["b"]))
                .with_nested("avatar", VisibilityPolicy::uniform(DenyList::new(["c"]))),
        );

        let out = policy.apply(&json!({
            "b": 1, "c": 1,
            "author": {"a": 1, "c": 1, "avatar": {"a": 1, "b": 1, "c": 1, "url": "u"}}
        }));

        assert_eq!(
            out,
            json!({"b": 1, "c": 1, "author": {"c": 1, "avatar": {"url": "u"}}})
        );
    }

    #[test]
    fn test_policy_yaml_roundtrip() {
        let yaml = r#"
deny: [hash, size]
nested:
  author:
    deny: [phone]
"#;
        let policy: VisibilityPolicy = serde_yaml::from_str(yaml).unwrap();
        assert!(policy.is_internal("hash"));
        assert!(!policy.is_internal("phone"));
        assert!(policy.nested["author"].is_internal("phone"));
    }
}
