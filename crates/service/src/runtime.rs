//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` to keep binary crates importing
//! `service::runtime::ensure_env` without depending directly on `common`.

use std::path::Path;

/// Ensure the directory holding the snapshot exists before the first save.
pub async fn ensure_env(snapshot_path: &Path) -> anyhow::Result<()> {
    common::env::ensure_parent_dir(snapshot_path).await
}
