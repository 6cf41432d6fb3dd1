//! Bounded LRU cache of [`Record`]s with deferred, atomically-persisted writes.
//!
//! Mirrors the teacher's `RecordStore` contract (get/put/remove + a
//! pending-write drain for the backing store) but collapses the
//! three-layer storage-engine hierarchy down to a single map guarded by
//! one [`parking_lot::Mutex`] — there is exactly one map here, not one
//! per partition.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use super::record::{PendingWrites, Record};

/// Maximum number of entries retained in memory. Least-recently-used
/// entries are evicted once a `put` would exceed this.
pub const CAPACITY: usize = 20;

struct Inner {
    entries: HashMap<String, Record>,
    /// Recency order: front is least-recently-used, back is most-recently-used.
    order: VecDeque<String>,
    pending_upserts: Vec<Record>,
    pending_deletions: Vec<String>,
}

/// The bounded, LRU-evicted, file-backed record cache.
pub struct RecordStore {
    inner: Mutex<Inner>,
}

impl RecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                pending_upserts: Vec::new(),
                pending_deletions: Vec::new(),
            }),
        }
    }

    /// Seeds the store from records already on disk, enforcing
    /// [`CAPACITY`] the same way [`Self::put`] does: if the document
    /// holds more than `CAPACITY` records, the oldest (by iteration
    /// order of `records`) are evicted and their ids recorded as
    /// pending deletions, so the next sync converges the on-disk
    /// document to the same bound.
    #[must_use]
    pub fn from_loaded(records: Vec<Record>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock();
            for record in records {
                let id = record.id().to_string();
                touch(&mut inner.order, &id);
                inner.entries.insert(id, record);

                if inner.entries.len() > CAPACITY {
                    if let Some(evicted_id) = inner.order.pop_front() {
                        inner.entries.remove(&evicted_id);
                        inner.pending_deletions.push(evicted_id);
                    }
                }
            }
        }
        store
    }

    /// Inserts or replaces `record`, bumping its recency. Evicts the
    /// least-recently-used entry (recording a pending deletion for it)
    /// if this insert pushes the store over [`CAPACITY`].
    pub fn put(&self, record: Record) -> Option<Record> {
        let mut inner = self.inner.lock();
        let id = record.id().to_string();
        touch(&mut inner.order, &id);
        let previous = inner.entries.insert(id, record.clone());
        inner.pending_upserts.push(record);

        if inner.entries.len() > CAPACITY {
            if let Some(evicted_id) = inner.order.pop_front() {
                inner.entries.remove(&evicted_id);
                inner.pending_deletions.push(evicted_id);
            }
        }
        previous
    }

    /// Returns the record for `id`, bumping its recency if present.
    pub fn get(&self, id: &str) -> Option<Record> {
        let mut inner = self.inner.lock();
        let record = inner.entries.get(id).cloned();
        if record.is_some() {
            touch(&mut inner.order, id);
        }
        record
    }

    /// Removes `id` if present, recording a pending deletion.
    pub fn remove(&self, id: &str) -> Option<Record> {
        let mut inner = self.inner.lock();
        let removed = inner.entries.remove(id);
        if removed.is_some() {
            inner.order.retain(|existing| existing != id);
            inner.pending_deletions.push(id.to_string());
        }
        removed
    }

    /// A stable snapshot of every record currently in the store, for persistence.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Record> {
        let inner = self.inner.lock();
        inner.entries.values().cloned().collect()
    }

    /// Current number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` if there are upserts or deletions not yet flushed to disk.
    #[must_use]
    pub fn has_pending_writes(&self) -> bool {
        let inner = self.inner.lock();
        !inner.pending_upserts.is_empty() || !inner.pending_deletions.is_empty()
    }

    /// Drains and returns the accumulated pending writes.
    ///
    /// The caller is expected to persist them; on failure it should not
    /// have observed this call (see [`Self::restore_pending_writes`]) so
    /// the next sweep retries.
    #[must_use]
    pub fn drain_pending_writes(&self) -> PendingWrites {
        let mut inner = self.inner.lock();
        PendingWrites {
            upserts: std::mem::take(&mut inner.pending_upserts),
            deletions: std::mem::take(&mut inner.pending_deletions),
        }
    }

    /// Re-queues writes drained but not successfully persisted, so the
    /// next sweep retries them. Newer mutations accumulated in the
    /// meantime are kept after the restored ones.
    pub fn restore_pending_writes(&self, writes: PendingWrites) {
        let mut inner = self.inner.lock();
        let mut upserts = writes.upserts;
        upserts.extend(std::mem::take(&mut inner.pending_upserts));
        inner.pending_upserts = upserts;

        let mut deletions = writes.deletions;
        deletions.extend(std::mem::take(&mut inner.pending_deletions));
        inner.pending_deletions = deletions;
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

fn touch(order: &mut VecDeque<String>, id: &str) {
    if let Some(pos) = order.iter().position(|existing| existing == id) {
        order.remove(pos);
    }
    order.push_back(id.to_string());
}
