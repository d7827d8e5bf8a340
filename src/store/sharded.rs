//! Shard Fan-Out
//!
//! A thin aggregator that spreads keys across many independent shards by
//! hash. Each shard carries its own buckets, fast view, and promotion
//! gate, so contention and promotion cost stay local to the shard a key
//! lands on.

use crate::error::StoreError;
use crate::store::entry::Entry;
use crate::store::shard::{Shard, ShardConfig, ShardStats};
use bytes::Bytes;
use std::sync::Arc;
use xxhash_rust::xxh64::xxh64;

/// Seed for the fan-out hash. Distinct from the in-shard bucket hash seed
/// so shard choice and bucket choice stay uncorrelated.
const FANOUT_SEED: u64 = 0x51_7c_c1_b7_27_22_0a_95;

/// A store that multiplexes get/set/delete across multiple [`Shard`]s.
///
/// # Example
///
/// ```
/// use blinkcache::store::{Entry, ShardStore, Value};
/// use bytes::Bytes;
///
/// let store = ShardStore::new(4);
/// store.set(
///     Bytes::from("name"),
///     Entry::new(Value::String(Bytes::from("blink"))),
/// );
/// assert!(store.get(&Bytes::from("name")).is_ok());
/// ```
#[derive(Debug)]
pub struct ShardStore {
    shards: Vec<Arc<Shard>>,
}

impl ShardStore {
    /// Creates a store with `shard_count` default-configured shards.
    pub fn new(shard_count: usize) -> Self {
        Self::with_config(shard_count, ShardConfig::default())
    }

    /// Creates a store with `shard_count` shards sharing one configuration.
    ///
    /// # Panics
    ///
    /// Panics if `shard_count` is zero or the config's `bucket_count` is
    /// not a power of two.
    pub fn with_config(shard_count: usize, config: ShardConfig) -> Self {
        assert!(shard_count > 0, "shard_count must be nonzero");
        Self {
            shards: (0..shard_count)
                .map(|_| Shard::with_config(config.clone()))
                .collect(),
        }
    }

    /// Inserts or overwrites a key. Always succeeds.
    pub fn set(&self, key: Bytes, entry: Entry) {
        self.shard_for(&key).set(key, entry);
    }

    /// Looks up a key.
    pub fn get(&self, key: &Bytes) -> Result<Arc<Entry>, StoreError> {
        self.shard_for(key).get(key)
    }

    /// Deletes a key. Idempotent.
    pub fn delete(&self, key: &Bytes) {
        self.shard_for(key).delete(key);
    }

    /// The shards backing this store, in index order. Useful for wiring a
    /// [`PromotionDriver`](crate::store::PromotionDriver) or inspecting
    /// per-shard pressure.
    pub fn shards(&self) -> &[Arc<Shard>] {
        &self.shards
    }

    /// Dirty-pressure counters summed across all shards.
    pub fn stats(&self) -> ShardStats {
        let mut total = ShardStats {
            dirty_buckets: 0,
            dirty_keys: 0,
        };
        for shard in &self.shards {
            let stats = shard.stats();
            total.dirty_buckets += stats.dirty_buckets;
            total.dirty_keys += stats.dirty_keys;
        }
        total
    }

    #[inline]
    fn shard_for(&self, key: &Bytes) -> &Arc<Shard> {
        let h = xxh64(key, FANOUT_SEED);
        &self.shards[(h % self.shards.len() as u64) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::entry::Value;
    use crate::store::gate::GateConfig;

    fn test_store() -> ShardStore {
        ShardStore::with_config(
            4,
            ShardConfig {
                bucket_count: 8,
                promote_max_buckets: 8,
                gate: GateConfig {
                    sample_mask: u64::MAX,
                    ..Default::default()
                },
                ..Default::default()
            },
        )
    }

    fn string_entry(value: &str) -> Entry {
        Entry::new(Value::String(Bytes::from(value.to_string())))
    }

    #[test]
    fn test_fan_out_roundtrip() {
        let store = test_store();
        for i in 0..100 {
            store.set(Bytes::from(format!("key:{}", i)), string_entry(&i.to_string()));
        }
        for i in 0..100 {
            let entry = store.get(&Bytes::from(format!("key:{}", i))).unwrap();
            assert_eq!(
                entry.value,
                Value::String(Bytes::from(i.to_string()))
            );
        }
    }

    #[test]
    fn test_shard_selection_is_stable() {
        let store = test_store();
        let key = Bytes::from("stable-key");
        let first = store.shard_for(&key);
        for _ in 0..50 {
            assert!(Arc::ptr_eq(first, store.shard_for(&key)));
        }
    }

    #[test]
    fn test_keys_spread_across_shards() {
        let store = test_store();
        for i in 0..200 {
            store.set(Bytes::from(format!("key:{}", i)), string_entry("v"));
        }
        let populated = store
            .shards()
            .iter()
            .filter(|s| s.stats().dirty_keys > 0)
            .count();
        assert!(populated > 1, "all 200 keys landed in one shard");
        assert_eq!(store.stats().dirty_keys, 200);
    }

    #[test]
    fn test_delete_through_fan_out() {
        let store = test_store();
        let key = Bytes::from("key");
        store.set(key.clone(), string_entry("value"));
        store.delete(&key);
        assert_eq!(store.get(&key).unwrap_err(), StoreError::KeyNotFound);
        // Idempotent on a missing key
        store.delete(&key);
    }

    #[test]
    fn test_promotion_per_shard() {
        let store = test_store();
        for i in 0..100 {
            store.set(Bytes::from(format!("key:{}", i)), string_entry("v"));
        }
        for shard in store.shards() {
            while shard.stats().dirty_buckets > 0 {
                shard.promote();
            }
        }
        assert_eq!(store.stats().dirty_keys, 0);
        for i in 0..100 {
            assert!(store.get(&Bytes::from(format!("key:{}", i))).is_ok());
        }
    }
}
