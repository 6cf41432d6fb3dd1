//! wxstation core -- Lamport clock, record/work-item types, wire protocol codec.
//!
//! This crate is the runtime-agnostic foundation shared by the server
//! binary and its tests:
//!
//! - **Lamport** ([`lamport`]): the monotonic counter used to order every
//!   externally observable event.
//! - **Record** ([`record`]): the opaque, `id`-keyed JSON record.
//! - **Work item** ([`work_item`]): the tagged unit dispatched from the
//!   connection front-end to the response worker.
//! - **Protocol** ([`protocol`]): parses the wire request format and
//!   encodes the JSON response envelope.
//! - **Error** ([`error`]): the shared error taxonomy.

pub mod error;
pub mod lamport;
pub mod protocol;
pub mod record;
pub mod work_item;

pub use error::{FileSyncError, NotFoundError, ProtocolError, RecordValidationError};
pub use lamport::LamportClock;
pub use protocol::{encode_response, parse_request, ParsedRequest};
pub use record::Record;
pub use work_item::WorkItem;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }

    #[test]
    fn reexports_accessible() {
        let clock = LamportClock::new();
        assert_eq!(clock.now(), 0);

        let record = Record::from_json(serde_json::json!({"id": "X"})).unwrap();
        let _item: WorkItem<()> = WorkItem::Fetch {
            id: record.id().to_string(),
            lamport: 0,
            socket: (),
        };

        match parse_request("GET HTTP/1.1\r\nUser-Agent: a b 1") {
            ParsedRequest::Fetch { .. } => {}
            other => panic!("unexpected parse result: {other:?}"),
        }
    }
}
