//! The unit of work enqueued by the connection front-end and consumed
//! exactly once by the response worker.
//!
//! Generic over the socket/responder type `S` so this crate does not
//! depend on an async runtime: the server crate instantiates `WorkItem`
//! with its own connection handle.

use crate::record::Record;

/// A single parsed request awaiting dispatch, carrying the socket that
/// owns the eventual response.
///
/// `lamport` is the remote Lamport value from the request header — the
/// field the request queue orders by. It is *not* the value written back
/// in the response; the worker ticks the local clock when it dispatches.
#[derive(Debug)]
pub enum WorkItem<S> {
    /// A validated `PUT` carrying a record to upsert.
    Push {
        producer_id: String,
        record: Record,
        lamport: u64,
        socket: S,
    },
    /// A `GET` for a single station id.
    Fetch {
        id: String,
        lamport: u64,
        socket: S,
    },
    /// A request that failed parsing/validation before a `Record` could
    /// be constructed; carries the status/message to send back verbatim.
    Reject {
        reason: String,
        status: u16,
        lamport: u64,
        socket: S,
    },
}

impl<S> WorkItem<S> {
    /// The Lamport value used to order this item in the request queue.
    #[must_use]
    pub fn lamport(&self) -> u64 {
        match self {
            WorkItem::Push { lamport, .. }
            | WorkItem::Fetch { lamport, .. }
            | WorkItem::Reject { lamport, .. } => *lamport,
        }
    }
}
