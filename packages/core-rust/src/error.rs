//! Shared error taxonomy for request handling and persistence.
//!
//! These are the error kinds spec'd as never propagating past their
//! designated boundary: protocol/validation/not-found errors are turned
//! into a response status by the caller, and `FileSyncError` is logged
//! and retried rather than failing the in-flight request it was
//! discovered during.

use thiserror::Error;

/// A malformed request: unknown verb, missing/short `User-Agent` header,
/// non-integer Lamport field, or invalid JSON body. Surfaced as HTTP 400.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ProtocolError(pub String);

/// A `PUSH` body that parsed as JSON but has a missing or empty `id`. Surfaced as HTTP 400.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("record is missing a non-empty `id` field")]
pub struct RecordValidationError;

/// A `FETCH` for an id not present in the store. Surfaced as HTTP 404.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("no record found for id `{0}`")]
pub struct NotFoundError(pub String);

/// The atomic rename dance in `RecordStore::sync_to_file` failed.
///
/// Logged and retried on the next sweep; the pending-write set is left
/// intact. Never fails the PUSH response that triggered the sync attempt.
#[derive(Debug, Error)]
#[error("failed to sync record store to {path}: {source}")]
pub struct FileSyncError {
    pub path: String,
    #[source]
    pub source: std::io::Error,
}
