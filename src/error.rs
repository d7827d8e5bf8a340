//! Error Types
//!
//! The core surfaces a single error kind: a key that is absent, expired,
//! or deleted all look the same to a caller. Set and delete cannot fail,
//! and promotion failures are invisible - a skipped cycle only widens the
//! staleness window, never breaks a read.

use thiserror::Error;

/// The only error the cache core produces.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Key absent, expired, or deleted - indistinguishable by design.
    #[error("key not found")]
    KeyNotFound,
}
