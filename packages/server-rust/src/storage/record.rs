//! Re-export of the wire-level [`Record`] type plus the pending-write
//! bookkeeping the [`super::record_store::RecordStore`] hands to
//! persistence.

pub use wx_core::Record;

/// The set of mutations accumulated since the last successful
/// [`super::record_store::RecordStore::sync_to_file`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingWrites {
    /// Records inserted or replaced since the last sync.
    pub upserts: Vec<Record>,
    /// Ids removed since the last sync.
    pub deletions: Vec<String>,
}

impl PendingWrites {
    /// `true` if there is nothing to persist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletions.is_empty()
    }
}
