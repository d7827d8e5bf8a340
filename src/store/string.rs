//! Typed String Facade
//!
//! Maps a byte-string API (get/set with an optional TTL) onto the generic
//! entry model. This is a thin adapter: all concurrency and promotion
//! behavior lives in the [`Shard`] underneath.

use crate::error::StoreError;
use crate::store::entry::{Entry, Value};
use crate::store::shard::{Shard, ShardConfig};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// A byte-string store backed by a single cache shard.
///
/// # Example
///
/// ```
/// use blinkcache::store::StringStore;
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// let store = StringStore::new();
/// store.set(Bytes::from("name"), Bytes::from("blink"), None);
/// assert_eq!(store.get(&Bytes::from("name")).unwrap(), Bytes::from("blink"));
///
/// store.set(
///     Bytes::from("session"),
///     Bytes::from("token"),
///     Some(Duration::from_secs(3600)),
/// );
/// ```
#[derive(Debug)]
pub struct StringStore {
    shard: Arc<Shard>,
}

impl StringStore {
    /// Creates a string store over a default-configured shard.
    pub fn new() -> Self {
        Self { shard: Shard::new() }
    }

    /// Creates a string store over a shard with the given configuration.
    pub fn with_config(config: ShardConfig) -> Self {
        Self {
            shard: Shard::with_config(config),
        }
    }

    /// Sets a key to a byte-string value, with an optional TTL.
    pub fn set(&self, key: Bytes, value: Bytes, ttl: Option<Duration>) {
        let entry = match ttl {
            Some(ttl) => Entry::with_ttl(Value::String(value), ttl),
            None => Entry::new(Value::String(value)),
        };
        self.shard.set(key, entry);
    }

    /// Gets the byte-string value for a key.
    pub fn get(&self, key: &Bytes) -> Result<Bytes, StoreError> {
        let entry = self.shard.get(key)?;
        match &entry.value {
            Value::String(value) => Ok(value.clone()),
            // A non-string entry under this facade is never its key
            _ => Err(StoreError::KeyNotFound),
        }
    }

    /// Deletes a key. Idempotent.
    pub fn delete(&self, key: &Bytes) {
        self.shard.delete(key);
    }

    /// The shard backing this store.
    pub fn shard(&self) -> &Arc<Shard> {
        &self.shard
    }
}

impl Default for StringStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::gate::GateConfig;

    fn test_store() -> StringStore {
        StringStore::with_config(ShardConfig {
            bucket_count: 8,
            promote_max_buckets: 8,
            gate: GateConfig {
                sample_mask: u64::MAX,
                ..Default::default()
            },
            ..Default::default()
        })
    }

    #[test]
    fn test_set_and_get() {
        let store = test_store();
        store.set(Bytes::from("key"), Bytes::from("value"), None);
        assert_eq!(store.get(&Bytes::from("key")).unwrap(), Bytes::from("value"));
    }

    #[test]
    fn test_get_missing() {
        let store = test_store();
        assert_eq!(
            store.get(&Bytes::from("missing")).unwrap_err(),
            StoreError::KeyNotFound
        );
    }

    #[test]
    fn test_ttl_expiry() {
        let store = test_store();
        store.set(
            Bytes::from("key"),
            Bytes::from("value"),
            Some(Duration::from_millis(40)),
        );
        assert!(store.get(&Bytes::from("key")).is_ok());

        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(
            store.get(&Bytes::from("key")).unwrap_err(),
            StoreError::KeyNotFound
        );
    }

    #[test]
    fn test_delete() {
        let store = test_store();
        store.set(Bytes::from("key"), Bytes::from("value"), None);
        store.delete(&Bytes::from("key"));
        assert_eq!(
            store.get(&Bytes::from("key")).unwrap_err(),
            StoreError::KeyNotFound
        );
    }

    #[test]
    fn test_overwrite_replaces_ttl() {
        let store = test_store();
        store.set(
            Bytes::from("key"),
            Bytes::from("v1"),
            Some(Duration::from_millis(40)),
        );
        // Overwrite without a TTL: the new entry never expires
        store.set(Bytes::from("key"), Bytes::from("v2"), None);

        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(store.get(&Bytes::from("key")).unwrap(), Bytes::from("v2"));
    }

    #[test]
    fn test_survives_promotion() {
        let store = test_store();
        store.set(Bytes::from("key"), Bytes::from("value"), None);
        while store.shard().stats().dirty_buckets > 0 {
            store.shard().promote();
        }
        assert_eq!(store.get(&Bytes::from("key")).unwrap(), Bytes::from("value"));
    }
}
