//! Tracks which producers are live and expires idle ones.

pub mod registry;

pub use registry::{ProducerRegistry, ProducerTracker, DEFAULT_MAX_IDLE_SECONDS};
