//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use std::path::Path;

use tracing::debug;

/// Create the parent directory of `path` if it is missing.
pub async fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", parent.display()))?;
    debug!(dir = %parent.display(), "data directory ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_nested_parent() -> anyhow::Result<()> {
        let root = std::env::temp_dir().join(format!("env_{}", uuid::Uuid::new_v4()));
        let file = root.join("a").join("b").join("users.json");
        ensure_parent_dir(&file).await?;
        assert!(tokio::fs::metadata(root.join("a").join("b")).await?.is_dir());
        let _ = tokio::fs::remove_dir_all(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn bare_file_name_needs_no_dir() -> anyhow::Result<()> {
        ensure_parent_dir(Path::new("users.json")).await
    }
}
