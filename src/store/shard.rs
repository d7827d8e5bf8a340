//! Two-Tier Cache Shard with Lock-Free Reads
//!
//! This module implements the core of BlinkCache: a bucketed dual-map
//! shard where writes land in per-bucket lock-guarded "dirty" maps and the
//! common-case read is served from an immutable, atomically-published
//! snapshot (the "fast view") without taking any lock.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Shard                              │
//! │                                                              │
//! │  fast view (ArcSwap)          dirty side                     │
//! │  ┌─────────────────┐          ┌──────────────────────┐       │
//! │  │ bucket 0 (Arc)  │          │ RwLock(bucket 0)  ●  │       │
//! │  │ bucket 1 (Arc)  │  promote │ RwLock(bucket 1)  ○  │       │
//! │  │ bucket 2 (Arc)  │ <─────── │ RwLock(bucket 2)  ●  │       │
//! │  │ ...             │  (merge) │ ...         dirty flags      │
//! │  └─────────────────┘          └──────────────────────┘       │
//! │         ▲ lock-free loads              ▲ locked writes       │
//! │      readers                        writers                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Read path
//!
//! `get` loads the published fast view and looks the key up in its bucket.
//! A live hit returns immediately with zero locks. On a miss the bucket is
//! marked dirty (pessimistic: the miss means the dirty side may hold
//! unreconciled state) and the dirty bucket is consulted under its read
//! lock - the dirty side is always authoritative. Misses feed the
//! [`PromoteGate`], which occasionally fires an asynchronous promotion.
//!
//! ## Promotion
//!
//! A promotion cycle walks up to `promote_max_buckets` dirty buckets
//! within a wall-clock budget, rebuilds each from the old clean bucket's
//! live entries merged with the dirty bucket's live entries (dirty wins on
//! collision), resets the dirty state under the bucket lock, and finally
//! publishes the whole rebuilt view in one atomic store. Readers see
//! either the old view or the new one, never a partial merge. Promotion
//! execution is single-flight: overlapping cycles are prevented by an
//! in-flight claim, not just by the gate's trigger debounce.

use crate::error::StoreError;
use crate::store::entry::{Entry, Holder};
use crate::store::gate::{GateConfig, PromoteGate};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use xxhash_rust::xxh64::xxh64;

/// A bucket: one partition of the shard's key space.
type Bucket = HashMap<Bytes, Arc<Holder>>;

/// Configuration for a [`Shard`].
#[derive(Debug, Clone)]
pub struct ShardConfig {
    /// Number of buckets; must be a power of two (default: 1024).
    pub bucket_count: usize,

    /// Maximum buckets rebuilt per promotion cycle (default: 8).
    pub promote_max_buckets: usize,

    /// Wall-clock budget per promotion cycle (default: 5ms).
    pub promote_budget: Duration,

    /// Promotion gate tunables.
    pub gate: GateConfig,
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            bucket_count: 1024,
            promote_max_buckets: 8,
            promote_budget: Duration::from_millis(5),
            gate: GateConfig::default(),
        }
    }
}

/// The immutable read-side snapshot: one clean bucket per index.
///
/// Once published a fast view is never mutated - promotion supersedes it
/// wholesale. A reader still holding a superseded view keeps reading it
/// safely until the last reference drops.
#[derive(Debug)]
struct FastView {
    buckets: Vec<Arc<Bucket>>,
}

impl FastView {
    fn empty(bucket_count: usize) -> Self {
        Self {
            buckets: (0..bucket_count).map(|_| Arc::new(Bucket::new())).collect(),
        }
    }
}

/// Advisory counters describing a shard's unreconciled state.
#[derive(Debug, Clone, Copy)]
pub struct ShardStats {
    /// Buckets currently flagged as holding unmerged writes.
    pub dirty_buckets: usize,
    /// Keys currently resident in the dirty maps.
    pub dirty_keys: u64,
}

/// A single cache shard: the two-tier bucketed map plus its promotion
/// machinery.
///
/// Designed to be shared behind `Arc` across any number of reader and
/// writer threads or tasks. All operations are thread-safe; only `set`,
/// `delete`, and the merging phase of a promotion ever block, and only on
/// the one bucket lock they touch.
///
/// # Example
///
/// ```
/// use blinkcache::store::{Entry, Shard, Value};
/// use bytes::Bytes;
///
/// let shard = Shard::new();
/// shard.set(
///     Bytes::from("name"),
///     Entry::new(Value::String(Bytes::from("blink"))),
/// );
/// let entry = shard.get(&Bytes::from("name")).unwrap();
/// assert_eq!(entry.value, Value::String(Bytes::from("blink")));
/// ```
#[derive(Debug)]
pub struct Shard {
    config: ShardConfig,

    /// `bucket_count - 1`, for masking hashes into bucket indices.
    index_mask: u64,

    /// The atomically-published read-side snapshot.
    fast: arc_swap::ArcSwap<FastView>,

    /// Mutable write-side buckets, one lock each.
    dirty: Vec<RwLock<Bucket>>,
    /// Per-bucket "has unmerged writes" flags.
    dirty_flags: Vec<AtomicBool>,
    /// Count of buckets whose flag is set.
    dirty_bucket_count: AtomicUsize,
    /// Count of keys resident in the dirty maps.
    dirty_key_count: AtomicU64,

    gate: PromoteGate,
    /// Monotonic request sequence feeding the gate's sampling.
    req_seq: AtomicU64,
    /// Single-flight claim around promotion execution.
    promoting: AtomicBool,

    /// Back-reference for dispatching fire-and-forget promotions.
    me: Weak<Shard>,
}

impl Shard {
    /// Creates a shard with default configuration.
    pub fn new() -> Arc<Self> {
        Self::with_config(ShardConfig::default())
    }

    /// Creates a shard with the given configuration.
    ///
    /// # Panics
    ///
    /// Panics if `bucket_count` is not a power of two.
    pub fn with_config(config: ShardConfig) -> Arc<Self> {
        assert!(
            config.bucket_count.is_power_of_two(),
            "bucket_count must be a power of two"
        );
        let bucket_count = config.bucket_count;
        let gate = PromoteGate::new(config.gate.clone());

        Arc::new_cyclic(|me| Self {
            index_mask: (bucket_count - 1) as u64,
            fast: arc_swap::ArcSwap::from_pointee(FastView::empty(bucket_count)),
            dirty: (0..bucket_count).map(|_| RwLock::new(Bucket::new())).collect(),
            dirty_flags: (0..bucket_count).map(|_| AtomicBool::new(false)).collect(),
            dirty_bucket_count: AtomicUsize::new(0),
            dirty_key_count: AtomicU64::new(0),
            gate,
            req_seq: AtomicU64::new(0),
            promoting: AtomicBool::new(false),
            me: me.clone(),
            config,
        })
    }

    /// Maps a key to its bucket index. Stable for a given key, and used
    /// identically for the dirty array and the fast view so the two sides
    /// stay in lock-step.
    #[inline]
    fn bucket_index(&self, key: &[u8]) -> usize {
        (xxh64(key, 0) & self.index_mask) as usize
    }

    /// Inserts or overwrites a key. Always succeeds.
    ///
    /// The key becomes visible to `get` immediately: a fresh key through
    /// the dirty path (it reaches the fast path with a later promotion),
    /// an overwritten key through whichever holder readers already see.
    pub fn set(&self, key: Bytes, entry: Entry) {
        let i = self.bucket_index(&key);
        let mut bucket = self.dirty[i].write();
        match bucket.get(&key) {
            // Pure overwrite: swap the entry inside the existing holder
            Some(holder) => holder.store(entry),
            None => {
                // A key that was promoted out of this bucket still has a
                // holder in the published view. Write through that shared
                // holder so fast-path readers observe the overwrite
                // immediately; a fresh holder would leave them serving
                // the old entry until the next promotion.
                let view = self.fast.load();
                let holder = match view.buckets[i].get(&key) {
                    Some(shared) => {
                        shared.store(entry);
                        Arc::clone(shared)
                    }
                    None => Arc::new(Holder::new(entry)),
                };
                self.dirty_key_count.fetch_add(1, Ordering::Relaxed);
                bucket.insert(key, holder);
            }
        }
        self.mark_dirty(i);
    }

    /// Looks up a key.
    ///
    /// Returns [`StoreError::KeyNotFound`] whether the key never existed,
    /// expired, or was deleted - callers cannot distinguish the three.
    pub fn get(&self, key: &Bytes) -> Result<Arc<Entry>, StoreError> {
        self.gate.on_read();
        let now = Instant::now();
        let i = self.bucket_index(key);

        // Fast path: lock-free load of the published view.
        let view = self.fast.load();
        if let Some(holder) = view.buckets[i].get(key) {
            let entry = holder.load();
            if entry.is_live(now) {
                return Ok(entry);
            }
        }

        // Fast-path miss. Treat it as a signal that the dirty side holds
        // unreconciled state for this bucket.
        self.mark_dirty(i);
        self.gate.on_miss();

        let entry = match self.get_dirty(i, key) {
            Some(entry) => entry,
            None => return Err(StoreError::KeyNotFound),
        };
        if entry.is_expired(now) {
            // Lazy expiry: invalidate, then excise from the dirty map.
            entry.invalidate();
            self.remove_dirty(i, key);
            return Err(StoreError::KeyNotFound);
        }
        if !entry.is_valid() {
            return Err(StoreError::KeyNotFound);
        }

        let seq = self.req_seq.fetch_add(1, Ordering::Relaxed);
        if self.gate.should_promote(
            now,
            seq,
            self.dirty_bucket_count.load(Ordering::Relaxed),
            self.dirty_key_count.load(Ordering::Relaxed),
        ) {
            self.spawn_promotion();
        }
        Ok(entry)
    }

    /// Deletes a key. Idempotent.
    ///
    /// Removes the dirty-side entry, logically invalidates any entry still
    /// reachable through the fast view, and marks the bucket dirty so the
    /// next promotion rebuilds it without the key. Skipping either of the
    /// last two steps would let a later promotion resurrect a stale clean
    /// entry.
    pub fn delete(&self, key: &Bytes) {
        let i = self.bucket_index(key);

        {
            let mut bucket = self.dirty[i].write();
            if bucket.remove(key).is_some() {
                self.dirty_key_count.fetch_sub(1, Ordering::Relaxed);
            }
            self.mark_dirty(i);
        }

        let view = self.fast.load();
        if let Some(holder) = view.buckets[i].get(key) {
            holder.load().invalidate();
        }
    }

    /// Runs one promotion cycle synchronously, unless another cycle is
    /// already in flight. Returns whether a cycle ran.
    ///
    /// Exposed for the promotion driver and for tests; normal operation
    /// triggers cycles through the gate instead.
    pub fn promote(&self) -> bool {
        if self
            .promoting
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }
        self.promote_cycle();
        self.promoting.store(false, Ordering::Release);
        true
    }

    /// Current dirty-pressure counters.
    ///
    /// Advisory: they may lag the maps they describe by a few operations.
    pub fn stats(&self) -> ShardStats {
        ShardStats {
            dirty_buckets: self.dirty_bucket_count.load(Ordering::Relaxed),
            dirty_keys: self.dirty_key_count.load(Ordering::Relaxed),
        }
    }

    /// Resets the gate's read/miss window, returning `(reads, misses)`.
    ///
    /// Call periodically so the gate's miss rate reflects recent traffic;
    /// the promotion driver does this on every tick.
    pub fn roll_gate_window(&self) -> (u64, u64) {
        self.gate.roll_window()
    }

    /// Sets the bucket's dirty flag, counting the transition.
    fn mark_dirty(&self, i: usize) {
        if !self.dirty_flags[i].swap(true, Ordering::AcqRel) {
            self.dirty_bucket_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Reads a key from the dirty bucket under its read lock.
    fn get_dirty(&self, i: usize, key: &Bytes) -> Option<Arc<Entry>> {
        let bucket = self.dirty[i].read();
        bucket.get(key).map(|holder| holder.load())
    }

    /// Excises a key from the dirty bucket under its write lock.
    fn remove_dirty(&self, i: usize, key: &Bytes) {
        let mut bucket = self.dirty[i].write();
        if bucket.remove(key).is_some() {
            self.dirty_key_count.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Dispatches a fire-and-forget promotion cycle.
    ///
    /// Claims the single-flight guard first so a no-op task is never
    /// spawned. Inside a tokio runtime the cycle runs on the blocking pool
    /// (it takes short blocking bucket locks); outside one it runs on a
    /// plain thread. Callers never wait on the result.
    fn spawn_promotion(&self) {
        if self
            .promoting
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return;
        }
        let Some(shard) = self.me.upgrade() else {
            self.promoting.store(false, Ordering::Release);
            return;
        };
        let run = move || {
            shard.promote_cycle();
            shard.promoting.store(false, Ordering::Release);
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(run);
            }
            Err(_) => {
                std::thread::spawn(run);
            }
        }
    }

    /// One bounded promotion cycle: merge up to `promote_max_buckets`
    /// dirty buckets into a rebuilt view within the wall-clock budget,
    /// then publish the view atomically.
    fn promote_cycle(&self) {
        let started = Instant::now();
        let old_view = self.fast.load_full();
        // Shallow copy: an array of bucket references, not bucket contents.
        let mut new_buckets = old_view.buckets.clone();

        let mut rebuilt = 0usize;
        let mut merged_keys = 0usize;
        for i in 0..new_buckets.len() {
            if rebuilt >= self.config.promote_max_buckets {
                break;
            }
            if !self.dirty_flags[i].load(Ordering::Acquire) {
                continue;
            }
            rebuilt += 1;

            let now = Instant::now();

            // Seed from the old clean bucket's live entries, outside the
            // lock - the published view is immutable.
            let mut merged: Bucket = HashMap::with_capacity(old_view.buckets[i].len());
            for (key, holder) in old_view.buckets[i].iter() {
                if holder.load().is_live(now) {
                    merged.insert(key.clone(), Arc::clone(holder));
                }
            }

            // Merge the dirty bucket and reset it, all under its lock so
            // the reset and flag-clear stay atomic w.r.t. writers.
            {
                let mut dirty = self.dirty[i].write();
                for (key, holder) in dirty.iter() {
                    // Dirty entries are newer: they win on collision
                    if holder.load().is_live(now) {
                        merged.insert(key.clone(), Arc::clone(holder));
                    }
                }
                self.dirty_key_count
                    .fetch_sub(dirty.len() as u64, Ordering::Relaxed);
                dirty.clear();
                if self.dirty_flags[i].swap(false, Ordering::AcqRel) {
                    self.dirty_bucket_count.fetch_sub(1, Ordering::Relaxed);
                }
                merged_keys += merged.len();
                new_buckets[i] = Arc::new(merged);
            }

            if started.elapsed() > self.config.promote_budget {
                trace!(rebuilt, "promotion budget exhausted");
                break;
            }
        }

        self.fast.store(Arc::new(FastView {
            buckets: new_buckets,
        }));
        debug!(
            rebuilt,
            merged_keys,
            elapsed_us = started.elapsed().as_micros() as u64,
            "promotion cycle published"
        );
    }
}
