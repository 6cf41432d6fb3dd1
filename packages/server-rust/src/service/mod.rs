//! The request queue and the single worker that drains it.
//!
//! - [`queue`]: the Lamport-ordered, single-producer/single-consumer
//!   [`queue::RequestQueue`].
//! - [`response_service`]: the worker loop that expires idle producers,
//!   flushes pending writes, and dispatches queued work items.

pub mod queue;
pub mod response_service;

pub use queue::RequestQueue;
pub use response_service::{CacheFileStatus, ResponseService};
