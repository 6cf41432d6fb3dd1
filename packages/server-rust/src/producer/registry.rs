//! Tracks the last time each producer was heard from, driving idle expiry.
//!
//! Modeled on the teacher's `ConnectionRegistry`: a `DashMap` keyed by id
//! alongside the tracker, giving lock-free concurrent `observe` calls
//! from many connection tasks while the response worker sweeps for
//! expired entries.

use std::time::Instant;

use dashmap::DashMap;

/// Default idle threshold, in seconds, before a producer is expired.
pub const DEFAULT_MAX_IDLE_SECONDS: u64 = 30;

/// Per-producer bookkeeping: when it was last heard from and what it last sent.
#[derive(Debug, Clone)]
pub struct ProducerTracker {
    /// Wall-clock instant this producer's last accepted push was observed.
    pub last_seen: Instant,
    /// The Lamport value carried by the last accepted push.
    pub last_lamport: u64,
    /// The id of the record last pushed by this producer (for removal on expiry).
    pub last_record_id: String,
}

/// Registry of live producer trackers, one per distinct producer id.
pub struct ProducerRegistry {
    trackers: DashMap<String, ProducerTracker>,
}

impl ProducerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trackers: DashMap::new(),
        }
    }

    /// Records (or creates) the tracker for `producer_id`, always
    /// refreshing `last_seen` to now.
    pub fn observe(&self, producer_id: &str, record_id: &str, lamport: u64) {
        self.trackers.insert(
            producer_id.to_string(),
            ProducerTracker {
                last_seen: Instant::now(),
                last_lamport: lamport,
                last_record_id: record_id.to_string(),
            },
        );
    }

    /// Removes and returns every tracker whose idle time exceeds
    /// `max_idle_seconds`, along with the record id each was last seen
    /// pushing (the caller removes that record from the `RecordStore`).
    #[must_use]
    pub fn expire(&self, max_idle_seconds: u64) -> Vec<(String, String)> {
        let threshold = std::time::Duration::from_secs(max_idle_seconds);
        let now = Instant::now();

        let expired_ids: Vec<String> = self
            .trackers
            .iter()
            .filter(|entry| now.duration_since(entry.value().last_seen) > threshold)
            .map(|entry| entry.key().clone())
            .collect();

        expired_ids
            .into_iter()
            .filter_map(|producer_id| {
                self.trackers
                    .remove(&producer_id)
                    .map(|(_, tracker)| (producer_id, tracker.last_record_id))
            })
            .collect()
    }

    /// Number of currently tracked producers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    /// `true` if no producers are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }
}

impl Default for ProducerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn observe_creates_tracker() {
        let registry = ProducerRegistry::new();
        registry.observe("IDS60901", "IDS60901", 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn observe_refreshes_existing_tracker() {
        let registry = ProducerRegistry::new();
        registry.observe("IDS60901", "IDS60901", 1);
        registry.observe("IDS60901", "IDS60901", 5);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn expire_leaves_fresh_trackers_alone() {
        let registry = ProducerRegistry::new();
        registry.observe("A", "A", 1);
        let expired = registry.expire(30);
        assert!(expired.is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn expire_removes_idle_trackers_and_their_record_id() {
        let registry = ProducerRegistry::new();
        registry.observe("A", "A-record", 1);
        sleep(Duration::from_millis(20));

        let expired = registry.expire(0);
        assert_eq!(expired, vec![("A".to_string(), "A-record".to_string())]);
        assert!(registry.is_empty());
    }

    #[test]
    fn expire_only_removes_what_exceeded_threshold() {
        let registry = ProducerRegistry::new();
        registry.observe("fresh", "fresh", 1);
        sleep(Duration::from_millis(20));
        registry.observe("fresh", "fresh", 2); // refreshed, stays alive

        let expired = registry.expire(0);
        // `fresh` was just refreshed so its idle time is ~0, not > 0.
        assert!(expired.is_empty() || !expired.iter().any(|(id, _)| id == "fresh"));
    }
}
