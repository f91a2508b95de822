use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use models::{User, UserId, UserRecord};
use tracing::{debug, info, warn};

use crate::errors::StoreError;
use crate::storage::snapshot::{read_snapshot, render_snapshot, write_snapshot, Snapshot};

/// Outcome of a successful snapshot load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub skipped: usize,
}

/// In-memory user map backed by a single JSON snapshot file.
///
/// Ids are allocated by the store and only ever grow: `next_id` stays above
/// every key, survives deletes, and is recomputed from the keys on load.
/// Nothing is written to disk until `save`/`try_save` is called.
///
/// The store does no locking of its own and its file I/O is blocking. Share it
/// through [`SharedUserStore`](crate::user_service::SharedUserStore) when several
/// tasks need it; that handle does the file I/O with `tokio::fs`.
#[derive(Debug)]
pub struct UserStore {
    users: BTreeMap<UserId, UserRecord>,
    next_id: u64,
    snapshot_path: PathBuf,
}

impl UserStore {
    /// Create an empty store bound to `snapshot_path`. Nothing is read until `load`.
    pub fn new<P: Into<PathBuf>>(snapshot_path: P) -> Self {
        Self { users: BTreeMap::new(), next_id: UserId::FIRST.get(), snapshot_path: snapshot_path.into() }
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// The id the next `create_user` will hand out.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Replace in-memory state with the snapshot on disk.
    ///
    /// A missing, unreadable or corrupt file leaves the store empty; entries that
    /// fail to decode are skipped individually.
    pub fn load(&mut self) {
        let read = read_snapshot(&self.snapshot_path);
        self.reconcile(read);
    }

    /// Like `load`, but reports failures instead of resetting.
    /// On error the in-memory state is left untouched.
    pub fn try_load(&mut self) -> Result<LoadSummary, StoreError> {
        let snapshot = read_snapshot(&self.snapshot_path)?;
        Ok(self.install(snapshot))
    }

    /// Apply the result of reading the snapshot: install it, or reset to empty
    /// when the file is missing, unreadable or corrupt.
    pub(crate) fn reconcile(&mut self, read: Result<Snapshot, StoreError>) {
        match read {
            Ok(snapshot) => {
                let summary = self.install(snapshot);
                if summary.skipped > 0 {
                    warn!(path = %self.snapshot_path.display(), skipped = summary.skipped, "skipped malformed snapshot entries");
                }
                info!(path = %self.snapshot_path.display(), loaded = summary.loaded, next_id = self.next_id, "snapshot loaded");
            }
            Err(StoreError::NotFound { path }) => {
                debug!(path = %path.display(), "no snapshot; starting empty");
                self.reset();
            }
            Err(e) => {
                warn!(error = %e, "discarding unreadable snapshot; starting empty");
                self.reset();
            }
        }
    }

    fn install(&mut self, snapshot: Snapshot) -> LoadSummary {
        let next_id = snapshot.users.keys().next_back().map_or(UserId::FIRST.get(), |max| max.get() + 1);
        let summary = LoadSummary { loaded: snapshot.users.len(), skipped: snapshot.skipped };
        self.users = snapshot.users;
        self.next_id = next_id;
        summary
    }

    /// Write the full map to the snapshot file. Write failures are logged and
    /// otherwise ignored; the in-memory state stays authoritative.
    pub fn save(&self) {
        if let Err(e) = self.try_save() {
            warn!(error = %e, "snapshot save failed; keeping in-memory state");
        }
    }

    /// Write the full map to the snapshot file, reporting failures.
    pub fn try_save(&self) -> Result<(), StoreError> {
        write_snapshot(&self.snapshot_path, &self.users)?;
        debug!(path = %self.snapshot_path.display(), users = self.users.len(), "snapshot saved");
        Ok(())
    }

    /// The snapshot text `try_save` would write.
    pub fn render(&self) -> Result<String, StoreError> {
        render_snapshot(&self.users)
    }

    /// Copy of every record keyed by id.
    pub fn get_users(&self) -> BTreeMap<UserId, UserRecord> {
        self.users.clone()
    }

    pub fn get_user(&self, id: UserId) -> Option<User> {
        self.users.get(&id).map(|rec| User::from_record(id, rec))
    }

    /// Allocate the next id and store the record under it.
    ///
    /// Fails only once the id space is used up.
    pub fn create_user(&mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Result<User, StoreError> {
        let id = UserId::new(self.next_id).map_err(|_| StoreError::IdSpaceExhausted)?;
        self.next_id += 1;
        let record = UserRecord::new(first_name, last_name);
        let user = User::from_record(id, &record);
        self.users.insert(id, record);
        debug!(user_id = %id, "user created");
        Ok(user)
    }

    /// Replace both names of an existing user. Returns `false` if `id` is unknown.
    pub fn update_user(&mut self, id: UserId, first_name: impl Into<String>, last_name: impl Into<String>) -> bool {
        match self.users.get_mut(&id) {
            Some(record) => {
                *record = UserRecord::new(first_name, last_name);
                debug!(user_id = %id, "user updated");
                true
            }
            None => false,
        }
    }

    /// Remove a user. Returns `false` if `id` is unknown. The id is not reused.
    pub fn delete_user(&mut self, id: UserId) -> bool {
        let existed = self.users.remove(&id).is_some();
        if existed {
            debug!(user_id = %id, "user deleted");
        }
        existed
    }

    fn reset(&mut self) {
        self.users.clear();
        self.next_id = UserId::FIRST.get();
    }
}
