//! Adaptive Promotion Gate
//!
//! Deciding "should we promote now?" on every request would cost more than
//! the promotions save, and promoting too often contends the bucket locks
//! for no benefit. The gate bounds both ends:
//!
//! 1. **Sampling**: only every `sample_mask + 1`-th request even evaluates
//!    the decision (a single bitwise AND on a monotonic counter).
//! 2. **Debounce**: a successful check suppresses further checks for a
//!    minimum interval.
//! 3. **Pressure shortcut**: a quiet shard (few dirty buckets and keys)
//!    promotes only once the observed miss rate crosses a target
//!    threshold, so promotion frequency tracks actual read-path cost.
//! 4. **Single-flight decision**: a compare-and-swap claim keeps two
//!    threads from both deciding to promote off the same window.
//!
//! The gate only affects *when* promotion runs. Correctness never depends
//! on its answers - the dirty path stays authoritative either way.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Tunables for the promotion gate.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Minimum interval between successful checks (default: 20ms).
    pub min_check_interval: Duration,

    /// Window miss-rate percentage that lets a low-pressure shard promote
    /// anyway (default: 2).
    pub target_miss_pct: u64,

    /// Dirty-bucket count at which promotion is considered regardless of
    /// miss rate (default: 8).
    pub min_dirty_buckets: usize,

    /// Dirty-key count at which promotion is considered regardless of
    /// miss rate (default: 4096).
    pub min_dirty_keys: u64,

    /// Sampling mask applied to the request sequence number; only calls
    /// where `seq & mask == 0` evaluate the decision (default: 1023,
    /// i.e. one call in 1024). Set to 0 to evaluate on every call.
    pub sample_mask: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_check_interval: Duration::from_millis(20),
            target_miss_pct: 2,
            min_dirty_buckets: 8,
            min_dirty_keys: 4096,
            sample_mask: 1023,
        }
    }
}

/// The adaptive trigger deciding when a promotion cycle should run.
///
/// All state is independently-ordered atomics; the counters are advisory
/// heuristics, never correctness-critical.
#[derive(Debug)]
pub struct PromoteGate {
    config: GateConfig,

    /// Reference point for the atomic timestamp below.
    epoch: Instant,

    /// Reads observed in the current window.
    window_reads: AtomicU64,
    /// Fast-path misses observed in the current window.
    window_misses: AtomicU64,
    /// Misses since the last successful check; consumed by the decision.
    misses_since_check: AtomicU64,

    /// Nanoseconds since `epoch` of the last successful check (0 = never).
    last_check_nanos: AtomicU64,
    /// Re-entrancy claim for the decision itself.
    checking: AtomicBool,
}

impl PromoteGate {
    /// Creates a gate with the given tunables.
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            epoch: Instant::now(),
            window_reads: AtomicU64::new(0),
            window_misses: AtomicU64::new(0),
            misses_since_check: AtomicU64::new(0),
            last_check_nanos: AtomicU64::new(0),
            checking: AtomicBool::new(false),
        }
    }

    /// Records a read observation.
    #[inline]
    pub fn on_read(&self) {
        self.window_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a fast-path miss observation.
    #[inline]
    pub fn on_miss(&self) {
        self.window_misses.fetch_add(1, Ordering::Relaxed);
        self.misses_since_check.fetch_add(1, Ordering::Relaxed);
    }

    /// Decides whether a promotion cycle should run now.
    ///
    /// `seq` is a monotonically increasing per-shard request sequence used
    /// for sampling; `dirty_buckets` and `dirty_keys` are the shard's
    /// current pressure counters.
    pub fn should_promote(
        &self,
        now: Instant,
        seq: u64,
        dirty_buckets: usize,
        dirty_keys: u64,
    ) -> bool {
        // Sampling gate: the overwhelming majority of calls stop here.
        if seq & self.config.sample_mask != 0 {
            return false;
        }

        if self.within_debounce(now) {
            return false;
        }

        // Pressure shortcut: a quiet shard promotes only when reads are
        // actually paying for it.
        if dirty_buckets < self.config.min_dirty_buckets
            && dirty_keys < self.config.min_dirty_keys
        {
            let reads = self.window_reads.load(Ordering::Relaxed);
            if reads == 0 {
                return false;
            }
            let misses = self.window_misses.load(Ordering::Relaxed);
            if misses * 100 < self.config.target_miss_pct * reads {
                return false;
            }
        }

        // Single-flight for the decision: one claimant per window.
        if self
            .checking
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }
        let decision = self.decide_claimed(now, dirty_buckets, dirty_keys);
        self.checking.store(false, Ordering::Release);
        decision
    }

    /// The claimed section of the decision. Re-checks the debounce (a
    /// concurrent check may have just succeeded), then triggers on a
    /// nonzero miss delta or on pressure at/above the minimums.
    fn decide_claimed(&self, now: Instant, dirty_buckets: usize, dirty_keys: u64) -> bool {
        if self.within_debounce(now) {
            return false;
        }

        let miss_delta = self.misses_since_check.swap(0, Ordering::Relaxed);
        let trigger = miss_delta > 0
            || dirty_buckets >= self.config.min_dirty_buckets
            || dirty_keys >= self.config.min_dirty_keys;
        if trigger {
            self.last_check_nanos
                .store(self.nanos_since_epoch(now), Ordering::Release);
        }
        trigger
    }

    /// Resets the read/miss window, returning the rolled-off counts.
    ///
    /// Called periodically (e.g. by the promotion driver) so the miss rate
    /// reflects recent traffic rather than the shard's whole lifetime.
    pub fn roll_window(&self) -> (u64, u64) {
        let reads = self.window_reads.swap(0, Ordering::Relaxed);
        let misses = self.window_misses.swap(0, Ordering::Relaxed);
        (reads, misses)
    }

    fn within_debounce(&self, now: Instant) -> bool {
        let last = self.last_check_nanos.load(Ordering::Acquire);
        if last == 0 {
            return false;
        }
        let elapsed = self.nanos_since_epoch(now).saturating_sub(last);
        elapsed < self.config.min_check_interval.as_nanos() as u64
    }

    /// Nanoseconds from the gate's epoch to `now`, clamped to at least 1
    /// so that 0 stays reserved for "never checked".
    fn nanos_since_epoch(&self, now: Instant) -> u64 {
        (now.saturating_duration_since(self.epoch).as_nanos() as u64).max(1)
    }
}
