use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use models::{User, UserId, UserRecord};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::errors::ServiceError;
use crate::storage::snapshot::{read_snapshot_async, write_snapshot_async};
use crate::user_store::UserStore;

/// Trait abstraction over user storage as seen by a serving layer.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn load(&self);
    async fn save(&self);
    async fn try_save(&self) -> Result<(), ServiceError>;
    async fn list(&self) -> BTreeMap<UserId, UserRecord>;
    async fn get(&self, id: UserId) -> Option<User>;
    async fn create(&self, first_name: String, last_name: String) -> Result<User, ServiceError>;
    async fn update(&self, id: UserId, first_name: String, last_name: String) -> bool;
    async fn delete(&self, id: UserId) -> bool;
}

/// `UserStore` behind a single lock.
///
/// Reads share the lock; load, save and every mutation take it exclusively,
/// so the map and the id counter always move together and no CRUD call can
/// interleave with snapshot I/O.
#[derive(Clone)]
pub struct SharedUserStore {
    inner: Arc<RwLock<UserStore>>,
}

impl SharedUserStore {
    pub fn new(store: UserStore) -> Self {
        Self { inner: Arc::new(RwLock::new(store)) }
    }

    /// Construct a store for `path` and load its snapshot.
    pub async fn open<P: Into<PathBuf>>(path: P) -> Self {
        let shared = Self::new(UserStore::new(path));
        shared.load().await;
        shared
    }

    /// Same outcome as `UserStore::load`, with the file read on tokio's file API.
    pub async fn load(&self) {
        let mut store = self.inner.write().await;
        let path = store.snapshot_path().to_path_buf();
        let read = read_snapshot_async(&path).await;
        store.reconcile(read);
    }

    pub async fn save(&self) {
        if let Err(e) = self.try_save().await {
            warn!(error = %e, "snapshot save failed; keeping in-memory state");
        }
    }

    pub async fn try_save(&self) -> Result<(), ServiceError> {
        // Exclusive so a concurrent mutation cannot land between render and write.
        let store = self.inner.write().await;
        let data = store.render()?;
        write_snapshot_async(store.snapshot_path(), data).await?;
        debug!(path = %store.snapshot_path().display(), users = store.len(), "snapshot saved");
        Ok(())
    }

    pub async fn list(&self) -> BTreeMap<UserId, UserRecord> {
        self.inner.read().await.get_users()
    }

    pub async fn get(&self, id: UserId) -> Option<User> {
        self.inner.read().await.get_user(id)
    }

    pub async fn create(&self, first_name: String, last_name: String) -> Result<User, ServiceError> {
        let user = self.inner.write().await.create_user(first_name, last_name)?;
        Ok(user)
    }

    pub async fn update(&self, id: UserId, first_name: String, last_name: String) -> bool {
        self.inner.write().await.update_user(id, first_name, last_name)
    }

    pub async fn delete(&self, id: UserId) -> bool {
        self.inner.write().await.delete_user(id)
    }

    /// Run `f` against the store while holding the write lock.
    /// `f` runs on the executor, so it should not call the blocking
    /// `UserStore::{load, save, try_load, try_save}`; use the async methods here.
    pub async fn transact<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut UserStore) -> R,
    {
        let mut store = self.inner.write().await;
        f(&mut *store)
    }
}

// Inherent methods win method resolution over trait methods, so each body
// forwards to the locked method of the same name above.
#[async_trait]
impl UserRepository for SharedUserStore {
    async fn load(&self) { self.load().await }
    async fn save(&self) { self.save().await }
    async fn try_save(&self) -> Result<(), ServiceError> { self.try_save().await }
    async fn list(&self) -> BTreeMap<UserId, UserRecord> { self.list().await }
    async fn get(&self, id: UserId) -> Option<User> { self.get(id).await }
    async fn create(&self, first_name: String, last_name: String) -> Result<User, ServiceError> { self.create(first_name, last_name).await }
    async fn update(&self, id: UserId, first_name: String, last_name: String) -> bool { self.update(id, first_name, last_name).await }
    async fn delete(&self, id: UserId) -> bool { self.delete(id).await }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn tmp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("svc_users_{}_{}.json", tag, Uuid::new_v4()))
    }

    #[tokio::test]
    async fn shared_store_crud_persists() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("crud");
        let store = SharedUserStore::open(&tmp).await;

        // initially empty
        assert!(store.list().await.is_empty());

        let ada = store.create("Ada".into(), "Lovelace".into()).await?;
        let alan = store.create("Alan".into(), "Turing".into()).await?;
        assert_eq!(ada.id.get(), 1);
        assert_eq!(alan.id.get(), 2);

        assert!(store.update(ada.id, "Ada".into(), "King".into()).await);
        assert!(store.delete(alan.id).await);
        assert!(!store.delete(alan.id).await);
        store.try_save().await?;

        // reload from disk
        let reloaded = SharedUserStore::open(&tmp).await;
        let users = reloaded.list().await;
        assert_eq!(users.len(), 1);
        assert_eq!(reloaded.get(ada.id).await.map(|u| u.last_name), Some("King".to_string()));
        assert_eq!(reloaded.transact(|s| s.next_id()).await, 2);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_creates_get_distinct_ids() -> Result<(), anyhow::Error> {
        let store = SharedUserStore::new(UserStore::new(tmp_path("concurrent")));
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.create(format!("U{i}"), "X".into()).await }));
        }
        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await??.id);
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 16);
        assert_eq!(store.transact(|s| s.next_id()).await, 17);
        Ok(())
    }

    #[tokio::test]
    async fn save_matches_sync_render() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("render");
        let store = SharedUserStore::new(UserStore::new(&tmp));
        for i in 0..11 {
            store.create(format!("F{i}"), "L".into()).await?;
        }
        store.try_save().await?;

        let on_disk = tokio::fs::read_to_string(&tmp).await?;
        let expected = crate::storage::snapshot::render_snapshot(&store.list().await)?;
        assert_eq!(on_disk, expected);
        assert!(on_disk.find("\"9\"") < on_disk.find("\"10\""));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn load_resets_on_unreadable_snapshot() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("unreadable");
        tokio::fs::write(&tmp, b"{\"1\": {\"first_name\": \"\xff\"}}").await?;
        let store = SharedUserStore::new(UserStore::new(&tmp));
        store.create("Stale".into(), "State".into()).await?;

        store.load().await;
        assert!(store.list().await.is_empty());
        assert_eq!(store.transact(|s| s.next_id()).await, 1);

        tokio::fs::write(&tmp, "{not json").await?;
        store.create("Stale".into(), "State".into()).await?;
        store.load().await;
        assert!(store.list().await.is_empty());

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn try_save_reports_missing_directory() {
        let tmp = std::env::temp_dir().join(format!("svc_nodir_{}", Uuid::new_v4())).join("users.json");
        let store = SharedUserStore::new(UserStore::new(&tmp));
        assert!(matches!(store.try_save().await, Err(ServiceError::Store(crate::StoreError::Io { .. }))));
        // save swallows the same failure
        store.save().await;
    }

    #[tokio::test]
    async fn works_through_trait_object() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("dyn");
        let repo: Arc<dyn UserRepository> = Arc::new(SharedUserStore::new(UserStore::new(&tmp)));
        repo.load().await;
        let u = repo.create("Grace".into(), "Hopper".into()).await?;
        assert_eq!(repo.get(u.id).await, Some(u.clone()));
        repo.save().await;

        let text = tokio::fs::read_to_string(&tmp).await?;
        assert!(text.contains("\"Hopper\""));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
