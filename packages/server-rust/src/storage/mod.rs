//! The bounded, LRU-evicted, file-backed record cache.
//!
//! - [`record`]: the stored [`record::Record`] plus pending-write bookkeeping.
//! - [`record_store`]: the in-memory cache contract (get/put/remove/snapshot).
//! - [`persist`]: the atomic `.tmp` -> `.bak` -> rename sync to disk.

pub mod persist;
pub mod record;
pub mod record_store;

pub use record::{PendingWrites, Record};
pub use record_store::{RecordStore, CAPACITY};
