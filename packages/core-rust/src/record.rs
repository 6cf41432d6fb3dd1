//! The weather record: an opaque JSON object identified by a required,
//! non-empty string `id` field.
//!
//! Everything beyond `id` is uninterpreted payload (spec's schema is
//! explicitly out of scope beyond that one field), so `Record` wraps a
//! `serde_json::Value` rather than a typed struct.

use serde_json::Value;

use crate::error::RecordValidationError;

/// A validated weather record: a JSON object with a non-empty `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: String,
    body: Value,
}

impl Record {
    /// Validates `body` as a record: must be a JSON object with a
    /// non-empty string `id` field.
    ///
    /// # Errors
    ///
    /// Returns [`RecordValidationError`] if `body` is not an object, has
    /// no `id` field, the `id` is not a string, or the `id` is empty.
    pub fn from_json(body: Value) -> Result<Self, RecordValidationError> {
        let id = body
            .as_object()
            .and_then(|obj| obj.get("id"))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or(RecordValidationError)?;

        Ok(Self { id, body })
    }

    /// The record's identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The full JSON body, including `id`, as stored/returned on the wire.
    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Consumes the record, returning its JSON body.
    #[must_use]
    pub fn into_body(self) -> Value {
        self.body
    }
}
