//! Entry Model: Values, Expiry, and the Holder Indirection Cell
//!
//! This module defines the record that every key in a shard resolves to.
//! An [`Entry`] couples a typed payload with two independent liveness
//! signals:
//!
//! 1. **Expiry**: an optional absolute deadline. An entry with a deadline
//!    in the past must never be returned to a caller.
//! 2. **Validity**: an atomic flag used for logical deletion. Flipping it
//!    to `false` hides the entry from every reader without taking a write
//!    lock on the map that contains it.
//!
//! Entries are immutable by convention: an overwrite installs a *new*
//! `Entry` rather than mutating the old one. The [`Holder`] cell makes
//! that cheap - it is a per-key indirection holding an atomically
//! swappable `Arc<Entry>`, so a reader that already found the holder
//! (on the lock-free fast path or under a bucket read lock) always
//! observes the most recently installed entry without further locking.

use arc_swap::ArcSwap;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The kind of value stored under a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// A plain byte string.
    String,
    /// A field-to-value map.
    Hash,
    /// A score-ordered member set.
    SortedSet,
}

/// A typed payload. The variant doubles as the entry's kind discriminator.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Plain byte string.
    String(Bytes),
    /// Field-to-value map.
    Hash(HashMap<Bytes, Bytes>),
    /// Score/member pairs, kept score-ordered by whoever builds them.
    SortedSet(Vec<(f64, Bytes)>),
}

impl Value {
    /// Returns the kind discriminator for this payload.
    pub fn kind(&self) -> Kind {
        match self {
            Value::String(_) => Kind::String,
            Value::Hash(_) => Kind::Hash,
            Value::SortedSet(_) => Kind::SortedSet,
        }
    }
}

/// A stored value with optional expiry and an atomic validity flag.
///
/// Entries are shared behind `Arc` and never mutated after construction,
/// except for the validity flag which may be cleared to logically delete
/// the entry in place.
#[derive(Debug)]
pub struct Entry {
    /// The payload.
    pub value: Value,
    /// Absolute expiry deadline (`None` = never expires).
    pub expire_at: Option<Instant>,
    /// Cleared to logically delete without structural map changes.
    valid: AtomicBool,
}

impl Entry {
    /// Creates an entry that never expires.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            expire_at: None,
            valid: AtomicBool::new(true),
        }
    }

    /// Creates an entry that expires `ttl` from now.
    pub fn with_ttl(value: Value, ttl: Duration) -> Self {
        Self {
            value,
            expire_at: Some(Instant::now() + ttl),
            valid: AtomicBool::new(true),
        }
    }

    /// Returns the kind discriminator of the payload.
    pub fn kind(&self) -> Kind {
        self.value.kind()
    }

    /// Checks whether this entry is past its deadline at `now`.
    ///
    /// Entries without a deadline never expire. Pure - callers sample the
    /// clock once per operation and pass it in.
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expire_at.map(|exp| now > exp).unwrap_or(false)
    }

    /// Returns whether the validity flag is still set.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Clears the validity flag, logically deleting the entry.
    #[inline]
    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }

    /// Valid and not expired: the only state a caller may observe.
    #[inline]
    pub fn is_live(&self, now: Instant) -> bool {
        self.is_valid() && !self.is_expired(now)
    }

    /// Returns the remaining TTL in milliseconds, or `None` if no expiry.
    pub fn ttl_ms(&self, now: Instant) -> Option<u64> {
        self.expire_at
            .map(|exp| exp.saturating_duration_since(now).as_millis() as u64)
    }
}

/// Per-key indirection cell: an atomically swappable reference to the
/// current [`Entry`] for that key.
///
/// The bucket map owns the holder; the holder owns the current entry.
/// Overwriting a key swaps the entry inside the existing holder, so the
/// same holder can sit in the dirty map and in any number of published
/// fast views at once - every reader sees the latest entry through it.
#[derive(Debug)]
pub struct Holder {
    entry: ArcSwap<Entry>,
}

impl Holder {
    /// Creates a holder around an initial entry.
    pub fn new(entry: Entry) -> Self {
        Self {
            entry: ArcSwap::from_pointee(entry),
        }
    }

    /// Loads the current entry.
    #[inline]
    pub fn load(&self) -> Arc<Entry> {
        self.entry.load_full()
    }

    /// Atomically installs a new entry, superseding the old one.
    #[inline]
    pub fn store(&self, entry: Entry) {
        self.entry.store(Arc::new(entry));
    }
}
