//! Background Promotion Driver
//!
//! The gate only fires promotions off the read path, so a shard that is
//! written to but rarely read can sit on dirty state indefinitely. The
//! driver bounds that staleness: a background task periodically promotes
//! any shard with outstanding dirty buckets and rolls the gate windows so
//! miss rates reflect recent traffic.
//!
//! The driver is optional. Correctness never depends on it - the dirty
//! path remains authoritative - it only tightens how far the fast view
//! can lag behind the writes.

use crate::store::shard::Shard;
use crate::store::sharded::ShardStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Configuration for the promotion driver.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Interval between driver ticks (default: 50ms).
    pub interval: Duration,

    /// Promote a shard only if it has at least this many dirty buckets
    /// (default: 1, i.e. any dirty state at all).
    pub min_dirty_buckets: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(50),
            min_dirty_buckets: 1,
        }
    }
}

/// A handle to the running promotion driver.
///
/// When this handle is dropped, the driver task stops.
#[derive(Debug)]
pub struct PromotionDriver {
    shutdown_tx: watch::Sender<bool>,
}

impl PromotionDriver {
    /// Starts the driver as a background task over the given shards.
    ///
    /// Must be called from within a tokio runtime. The driver stops when
    /// the returned handle is dropped.
    pub fn start(shards: Vec<Arc<Shard>>, config: DriverConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(driver_loop(shards, config, shutdown_rx));

        info!("Background promotion driver started");

        Self { shutdown_tx }
    }

    /// Stops the driver.
    ///
    /// Called automatically when the handle is dropped.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        info!("Background promotion driver stopped");
    }
}

impl Drop for PromotionDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main driver loop.
async fn driver_loop(
    shards: Vec<Arc<Shard>>,
    config: DriverConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(config.interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Promotion driver received shutdown signal");
                    return;
                }
            }
        }

        for (i, shard) in shards.iter().enumerate() {
            let (reads, misses) = shard.roll_gate_window();
            if reads > 0 {
                trace!(
                    shard = i,
                    reads,
                    misses,
                    "gate window rolled"
                );
            }

            let stats = shard.stats();
            if stats.dirty_buckets < config.min_dirty_buckets {
                continue;
            }
            if shard.promote() {
                debug!(
                    shard = i,
                    dirty_buckets = stats.dirty_buckets,
                    dirty_keys = stats.dirty_keys,
                    "driver promoted shard"
                );
            }
        }
    }
}

/// Starts a promotion driver over every shard of a [`ShardStore`] with
/// default configuration.
pub fn start_promotion_driver(store: &ShardStore) -> PromotionDriver {
    PromotionDriver::start(store.shards().to_vec(), DriverConfig::default())
}
