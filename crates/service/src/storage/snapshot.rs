use std::{
    collections::BTreeMap,
    fs, io,
    path::Path,
};

use models::{UserId, UserRecord};
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::StoreError;

/// Decoded snapshot content.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Snapshot {
    pub users: BTreeMap<UserId, UserRecord>,
    /// Entries dropped because the key is not a valid id or the value is not a record.
    pub skipped: usize,
}

fn read_error(path: &Path, source: io::Error) -> StoreError {
    match source.kind() {
        io::ErrorKind::NotFound => StoreError::NotFound { path: path.to_path_buf() },
        _ => StoreError::Io { path: path.to_path_buf(), source },
    }
}

/// Read and decode the snapshot at `path`.
pub fn read_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
    let raw = fs::read_to_string(path).map_err(|e| read_error(path, e))?;
    decode_snapshot(&raw).map_err(|source| StoreError::Malformed { path: path.to_path_buf(), source })
}

/// `read_snapshot` on tokio's file API, for callers running on an executor.
pub async fn read_snapshot_async(path: &Path) -> Result<Snapshot, StoreError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| read_error(path, e))?;
    decode_snapshot(&raw).map_err(|source| StoreError::Malformed { path: path.to_path_buf(), source })
}

/// Decode snapshot text. The document must be a JSON object; individual entries
/// that fail to decode are counted and skipped rather than failing the whole read.
pub fn decode_snapshot(raw: &str) -> Result<Snapshot, serde_json::Error> {
    let entries: Map<String, Value> = serde_json::from_str(raw)?;
    let mut snapshot = Snapshot::default();
    for (key, value) in entries {
        let Ok(id) = key.parse::<UserId>() else {
            debug!(%key, "skipping snapshot entry with invalid id");
            snapshot.skipped += 1;
            continue;
        };
        match serde_json::from_value::<UserRecord>(value) {
            Ok(record) => {
                snapshot.users.insert(id, record);
            }
            Err(e) => {
                debug!(%key, error = %e, "skipping malformed snapshot record");
                snapshot.skipped += 1;
            }
        }
    }
    Ok(snapshot)
}

/// Render users as snapshot text: keys are the decimal ids in ascending
/// numeric order, two-space indentation, trailing newline.
pub fn render_snapshot(users: &BTreeMap<UserId, UserRecord>) -> Result<String, StoreError> {
    let mut out = serde_json::to_string_pretty(users).map_err(StoreError::Encode)?;
    out.push('\n');
    Ok(out)
}

/// Render and overwrite the snapshot at `path`.
pub fn write_snapshot(path: &Path, users: &BTreeMap<UserId, UserRecord>) -> Result<(), StoreError> {
    let data = render_snapshot(users)?;
    fs::write(path, data).map_err(|source| StoreError::Io { path: path.to_path_buf(), source })
}

/// Overwrite the snapshot at `path` with already rendered text, via tokio.
pub async fn write_snapshot_async(path: &Path, data: String) -> Result<(), StoreError> {
    tokio::fs::write(path, data)
        .await
        .map_err(|source| StoreError::Io { path: path.to_path_buf(), source })
}
