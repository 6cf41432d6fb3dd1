//! Lamport logical clock for ordering externally observable events.
//!
//! The clock is a single nonnegative counter shared by the connection
//! front-end (which merges remote values from incoming requests) and the
//! response worker (which only reads it). Both directions must be safe
//! under concurrent invocation without ever observing a decrease.

use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically nondecreasing Lamport counter.
///
/// `tick`, `merge`, and `now` are all `&self` methods backed by a single
/// `AtomicU64`, so the clock can be shared behind an `Arc` without a lock.
#[derive(Debug, Default)]
pub struct LamportClock {
    value: AtomicU64,
}

impl LamportClock {
    /// Creates a clock starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    /// Atomically increments the clock for a local event and returns the new value.
    pub fn tick(&self) -> u64 {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Merges a remote value into the clock: `value <- max(value, remote)`.
    ///
    /// Never decreases the clock, regardless of how `remote` compares.
    pub fn merge(&self, remote: u64) {
        self.value.fetch_max(remote, Ordering::SeqCst);
    }

    /// Returns the current value without advancing the clock.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}
