//! Server-local error types: failures that terminate a service rather
//! than being turned into a response status.

use thiserror::Error;

/// The accept loop could not continue: the listening socket failed to
/// bind or a subsequent accept returned an unrecoverable I/O error.
///
/// Logged and surfaced by the Orchestrator; not retried, since a
/// listener that cannot accept connections cannot serve the station.
#[derive(Debug, Error)]
#[error("connection service failed: {0}")]
pub struct FatalListenerError(#[from] pub std::io::Error);
