//! Like toggle: idempotent set membership on a record's `likes` array

use crate::core::entity::EntityRecord;
use crate::core::service::EntityStore;
use anyhow::{Result, anyhow};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

/// Field holding the ids of the users who liked a record
pub const LIKES_FIELD: &str = "likes";

/// Compute the new `likes` list, or `None` when nothing changes
///
/// User ids are compared by their textual form, so `7` and `"7"` are the
/// same user. Ids are stored as strings.
pub fn apply_like(current: Option<&Value>, user_id: &str, liked: bool) -> Option<Vec<Value>> {
    let mut likes: Vec<Value> = match current {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    let position = likes.iter().position(|v| same_user(v, user_id));

    match (liked, position) {
        (true, None) => {
            likes.push(Value::String(user_id.to_string()));
            Some(likes)
        }
        (false, Some(index)) => {
            likes.remove(index);
            Some(likes)
        }
        _ => None,
    }
}

fn same_user(value: &Value, user_id: &str) -> bool {
    match value {
        Value::String(s) => s == user_id,
        Value::Number(n) => n.to_string() == user_id,
        Value::Object(map) => map.get("id").is_some_and(|id| same_user(id, user_id)),
        _ => false,
    }
}

/// Serializes like toggles per record
///
/// Two toggles on the same record never interleave their read and write.
/// Toggles on different records run concurrently.
pub struct LikeToggle {
    store: Arc<dyn EntityStore>,
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl LikeToggle {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Add or remove `user_id` from the record's likes
    ///
    /// Returns `Ok(None)` when the record does not exist. When the list
    /// would not change the record is returned as-is without a write.
    pub async fn toggle(&self, id: &Uuid, user_id: &str, liked: bool) -> Result<Option<EntityRecord>> {
        let lease = self.lease(id)?;
        let _guard = lease.lock.lock().await;
        self.toggle_locked(id, user_id, liked).await
    }

    async fn toggle_locked(&self, id: &Uuid, user_id: &str, liked: bool) -> Result<Option<EntityRecord>> {
        let Some(record) = self.store.find_one(id).await? else {
            return Ok(None);
        };

        match apply_like(record.get(LIKES_FIELD), user_id, liked) {
            Some(likes) => {
                tracing::debug!(%id, user_id, liked, "updating likes");
                let mut patch = Map::new();
                patch.insert(LIKES_FIELD.to_string(), Value::Array(likes));
                self.store.update(id, patch).await
            }
            None => Ok(Some(record)),
        }
    }

    fn lease(&self, id: &Uuid) -> Result<LockLease<'_>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| anyhow!("Failed to acquire lock table: {}", e))?;
        let lock = locks.entry(*id).or_default().clone();
        Ok(LockLease {
            locks: &self.locks,
            id: *id,
            lock,
        })
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or_default()
    }
}

/// A handle on one record's lock
///
/// Dropping the lease, on completion or when the toggle future is
/// cancelled, removes the table entry once nobody else holds it.
struct LockLease<'a> {
    locks: &'a Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
    id: Uuid,
    lock: Arc<AsyncMutex<()>>,
}

impl Drop for LockLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the table, one in this lease
        if locks
            .get(&self.id)
            .is_some_and(|lock| Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2)
        {
            locks.remove(&self.id);
        }
    }
}
