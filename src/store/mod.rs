//! Store Module
//!
//! The core of BlinkCache: a two-tier, bucketed key-value shard plus the
//! thin layers built on top of it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ShardStore                            │
//! │   ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌─────────┐         │
//! │   │ Shard 0 │  │ Shard 1 │  │ Shard 2 │  │ ...N    │         │
//! │   │ fast ⇄  │  │ fast ⇄  │  │ fast ⇄  │  │ shards  │         │
//! │   │ dirty   │  │ dirty   │  │ dirty   │  │         │         │
//! │   └─────────┘  └─────────┘  └─────────┘  └─────────┘         │
//! └──────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │
//!              ┌─────────────┴─────────────┐
//!              │     PromotionDriver       │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Pieces
//!
//! - [`Entry`] / [`Holder`]: the value record and its per-key atomic
//!   indirection cell
//! - [`PromoteGate`]: the adaptive trigger deciding when to promote
//! - [`Shard`]: the dual-map core with lock-free reads
//! - [`ShardStore`]: hash fan-out across shards
//! - [`StringStore`]: byte-string facade with TTL
//! - [`PromotionDriver`]: optional background staleness bound
//!
//! ## Example
//!
//! ```
//! use blinkcache::store::StringStore;
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let store = StringStore::new();
//!
//! store.set(Bytes::from("name"), Bytes::from("blink"), None);
//! assert_eq!(store.get(&Bytes::from("name")).unwrap(), Bytes::from("blink"));
//!
//! store.set(
//!     Bytes::from("session"),
//!     Bytes::from("token123"),
//!     Some(Duration::from_secs(3600)),
//! );
//! ```

pub mod driver;
pub mod entry;
pub mod gate;
pub mod shard;
pub mod sharded;
pub mod string;

// Re-export commonly used types
pub use driver::{start_promotion_driver, DriverConfig, PromotionDriver};
pub use entry::{Entry, Holder, Kind, Value};
pub use gate::{GateConfig, PromoteGate};
pub use shard::{Shard, ShardConfig, ShardStats};
pub use sharded::ShardStore;
pub use string::StringStore;
