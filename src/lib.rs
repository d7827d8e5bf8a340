//! # BlinkCache - A Concurrent Two-Tier In-Memory Cache Shard
//!
//! BlinkCache is an in-process, highly concurrent key-value cache shard:
//! a building block for a larger sharded store. It serves point reads
//! with minimal contention while absorbing a high rate of writes.
//!
//! ## Features
//!
//! - **Lock-Free Reads**: the common-case read loads an immutable,
//!   atomically-published snapshot and touches no lock
//! - **Bucketed Writes**: writes land in per-bucket lock-guarded maps, so
//!   contention on one key never blocks unrelated buckets
//! - **Adaptive Promotion**: a sampled, debounced gate decides when to
//!   merge the write buffer into a fresh read snapshot, with a bounded
//!   per-cycle bucket count and wall-clock budget
//! - **TTL Support**: entries carry optional absolute expiry, enforced
//!   lazily on access and during promotion
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          BlinkCache                             │
//! │                                                                 │
//! │   writers ──────────────┐          ┌────────────── readers      │
//! │                         ▼          ▼                            │
//! │              ┌──────────────┐   ┌──────────────┐                │
//! │              │  dirty side  │   │  fast view   │                │
//! │              │  (per-bucket │   │  (immutable  │                │
//! │              │   RwLocks)   │   │   snapshot)  │                │
//! │              └──────┬───────┘   └──────▲───────┘                │
//! │                     │     promotion    │                        │
//! │                     └──────────────────┘                        │
//! │                 (bounded merge, atomic publish,                 │
//! │                  triggered by the PromoteGate)                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use blinkcache::store::StringStore;
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let store = StringStore::new();
//!
//! // Writes are visible immediately through the dirty path
//! store.set(Bytes::from("name"), Bytes::from("blink"), None);
//! assert_eq!(store.get(&Bytes::from("name")).unwrap(), Bytes::from("blink"));
//!
//! // Keys with a TTL expire on their own
//! store.set(
//!     Bytes::from("session"),
//!     Bytes::from("token123"),
//!     Some(Duration::from_secs(3600)),
//! );
//!
//! // Deletes take effect immediately and survive promotion
//! store.delete(&Bytes::from("name"));
//! assert!(store.get(&Bytes::from("name")).is_err());
//! ```
//!
//! ## Module Overview
//!
//! - [`store`]: the shard core, fan-out store, string facade, and
//!   promotion driver
//! - [`error`]: the single error kind the core surfaces
//!
//! ## Design Highlights
//!
//! ### Bounded Staleness, Never Incorrectness
//!
//! A fast-path reader may observe a snapshot that lags recent writes; the
//! lag is bounded by the gate's debounce interval and sampling rate, and
//! optionally by the [`store::PromotionDriver`]. A reader that misses the
//! fast path falls through to the dirty side, which is always
//! authoritative - so results are correct no matter when (or whether)
//! promotion runs.
//!
//! ### Promotion Never Blocks Readers
//!
//! Promotion rebuilds bucket maps off to the side and publishes the whole
//! view with a single atomic store. Readers see the old view or the new
//! one, never a partially merged one. Only writers on the specific bucket
//! being merged are briefly excluded.
//!
//! ### Logical Deletion
//!
//! Every entry carries an atomic validity flag. Clearing it hides the
//! entry from all readers - including those on the lock-free fast path -
//! without taking a single lock; promotion later excises it physically.

pub mod error;
pub mod store;

// Re-export commonly used types for convenience
pub use error::StoreError;
pub use store::{
    start_promotion_driver, DriverConfig, Entry, GateConfig, Kind, PromoteGate, PromotionDriver,
    Shard, ShardConfig, ShardStats, ShardStore, StringStore, Value,
};

/// Version of BlinkCache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
