//! Atomic JSON-file persistence for the [`super::record_store::RecordStore`].
//!
//! The on-disk document is always either a fully valid JSON array
//! reflecting a past consistent snapshot, or absent — partial writes are
//! never observable. The `.tmp` -> `.bak` -> rename dance below is the
//! whole of that contract; nothing here truncates a file in place.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use wx_core::{FileSyncError, Record};

use super::record::PendingWrites;

/// Loads the on-disk document into an id-keyed map.
///
/// Best-effort: a missing file, empty file, or file that does not parse
/// as a JSON array of valid records yields an empty map rather than an
/// error — the store simply starts empty.
pub fn load_from_file(path: &Path) -> HashMap<String, Record> {
    let Ok(contents) = fs::read_to_string(path) else {
        return HashMap::new();
    };
    if contents.trim().is_empty() {
        return HashMap::new();
    }
    let Ok(serde_json::Value::Array(items)) = serde_json::from_str(&contents) else {
        tracing::warn!(path = %path.display(), "cache file did not contain a JSON array; starting empty");
        return HashMap::new();
    };

    let mut records = HashMap::new();
    for item in items {
        match Record::from_json(item) {
            Ok(record) => {
                records.insert(record.id().to_string(), record);
            }
            Err(_) => tracing::warn!(path = %path.display(), "skipping invalid record in cache file"),
        }
    }
    records
}

/// Applies `pending` to the on-disk document atomically.
///
/// 1. Reads the current document (tolerating a missing file as empty).
/// 2. Applies the pending upserts and deletions to it.
/// 3. Serializes the merged map to `<path>.tmp`.
/// 4. Renames `<path>` to `<path>.bak` if it exists.
/// 5. Renames `<path>.tmp` to `<path>`.
/// 6. Deletes `<path>.bak`.
///
/// At every instant at most one of `<path>`/`<path>.bak` need be
/// present, and `<path>` is never a partial write.
///
/// # Errors
///
/// Returns [`FileSyncError`] if any filesystem step fails. The caller is
/// expected to leave its pending-write set intact so the next sweep
/// retries.
pub fn sync_to_file(path: &Path, pending: &PendingWrites) -> Result<(), FileSyncError> {
    let sync_err = |source: std::io::Error| FileSyncError {
        path: path.display().to_string(),
        source,
    };

    let mut merged = load_from_file(path);
    for record in &pending.upserts {
        merged.insert(record.id().to_string(), record.clone());
    }
    for id in &pending.deletions {
        merged.remove(id);
    }

    let values: Vec<&serde_json::Value> = merged.values().map(Record::body).collect();
    let serialized = serde_json::to_string_pretty(&values).expect("record array is serializable");

    let tmp_path = tmp_path(path);
    let bak_path = bak_path(path);

    fs::write(&tmp_path, serialized).map_err(sync_err)?;

    if path.exists() {
        fs::rename(path, &bak_path).map_err(sync_err)?;
    }
    fs::rename(&tmp_path, path).map_err(sync_err)?;
    if bak_path.exists() {
        fs::remove_file(&bak_path).map_err(sync_err)?;
    }

    Ok(())
}

/// Creates an empty array file at `path` if nothing exists there yet.
///
/// Used at boot to establish the cache-file status the response service
/// reports via 200-vs-201 (see `CacheFileStatus`).
///
/// # Errors
///
/// Returns the underlying I/O error if the file cannot be created.
pub fn ensure_file_exists(path: &Path) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    fs::write(path, "[]")?;
    Ok(true)
}

fn tmp_path(path: &Path) -> std::path::PathBuf {
    append_extension(path, "tmp")
}

fn bak_path(path: &Path) -> std::path::PathBuf {
    append_extension(path, "bak")
}

fn append_extension(path: &Path, ext: &str) -> std::path::PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    std::path::PathBuf::from(name)
}
