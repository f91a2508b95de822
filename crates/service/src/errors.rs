use std::{io, path::PathBuf};

use thiserror::Error;

/// Failures of snapshot I/O and id allocation.
///
/// `UserStore::load` and `UserStore::save` absorb these; only the `try_*`
/// variants hand them to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot not found: {}", .path.display())]
    NotFound { path: PathBuf },
    #[error("snapshot io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed snapshot at {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("snapshot encode error: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("user id space exhausted")]
    IdSpaceExhausted,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }
}
