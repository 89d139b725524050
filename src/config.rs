//! # Bus configuration.
//!
//! Provides [`BusConfig`], the settings a [`LocalBus`](crate::LocalBus)
//! derives its worker pool from.
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → elastic pool, no concurrency ceiling.

/// Configuration for one bus instance.
///
/// Fields are public for flexibility; prefer the helper accessors to avoid
/// sprinkling sentinel checks across the codebase.
#[derive(Clone, Copy, Debug)]
pub struct BusConfig {
    /// Maximum number of dispatch runs executing concurrently.
    ///
    /// - `0` = unlimited: every publish runs as soon as the runtime
    ///   schedules it.
    /// - `n > 0` = at most `n` dispatch runs at once; excess publishes wait
    ///   inside their own queued task, never on the publishing thread.
    ///
    /// A bounded pool is the recommended strengthening for busy systems: a
    /// republish storm then degrades into queuing instead of unbounded task
    /// growth.
    pub max_concurrent: usize,
}

impl BusConfig {
    /// Returns the concurrency ceiling as an `Option`.
    ///
    /// - `None` → unlimited (elastic pool)
    /// - `Some(n)` → at most `n` concurrent dispatch runs
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_concurrent == 0 {
            None
        } else {
            Some(self.max_concurrent)
        }
    }

    /// Convenience constructor for a bounded bus.
    pub fn bounded(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }
}

impl Default for BusConfig {
    /// Default configuration:
    ///
    /// - `max_concurrent = 0` (elastic pool, grows with load)
    fn default() -> Self {
        Self { max_concurrent: 0 }
    }
}
