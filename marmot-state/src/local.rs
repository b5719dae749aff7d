//! State kept in a JSON file on local disk
//!
//! The lock lives beside it: `marmot.state.json` is guarded by
//! `marmot.state.lock`, created exclusively so that only one run can win it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::lock::StateLock;
use crate::state::StateFile;
use crate::store::{StateStore, StoreError, StoreResult};

pub const DEFAULT_STATE_FILE: &str = "marmot.state.json";

pub struct LocalStore {
    state_path: PathBuf,
    lock_path: PathBuf,
}

impl LocalStore {
    pub fn at(state_path: PathBuf) -> Self {
        let lock_path = state_path.with_extension("lock");
        Self {
            state_path,
            lock_path,
        }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    async fn read_lock(&self) -> StoreResult<Option<StateLock>> {
        let content = match fs::read(&self.lock_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io("read", &self.lock_path, e)),
        };

        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                what: "lock file",
                path: self.lock_path.clone(),
                source,
            })
    }

    async fn clear_lock(&self) -> StoreResult<()> {
        match fs::remove_file(&self.lock_path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                Err(StoreError::io("remove", &self.lock_path, e))
            }
            _ => Ok(()),
        }
    }

    /// Fails with `AlreadyExists` when another run holds the file
    async fn create_lock_file(&self, content: &[u8]) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_path)
            .await?;
        file.write_all(content).await?;
        file.flush().await
    }
}

#[async_trait]
impl StateStore for LocalStore {
    async fn load(&self) -> StoreResult<Option<StateFile>> {
        let content = match fs::read(&self.state_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io("read", &self.state_path, e)),
        };

        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                what: "state file",
                path: self.state_path.clone(),
                source,
            })
    }

    async fn save(&self, state: &StateFile) -> StoreResult<()> {
        if let Some(stored) = self.load().await?
            && stored.lineage != state.lineage
        {
            return Err(StoreError::LineageConflict {
                stored: stored.lineage,
                given: state.lineage.clone(),
            });
        }

        let content = serde_json::to_vec_pretty(state)?;
        let staged = self.state_path.with_extension("json.tmp");
        fs::write(&staged, content)
            .await
            .map_err(|e| StoreError::io("write", &staged, e))?;
        fs::rename(&staged, &self.state_path)
            .await
            .map_err(|e| StoreError::io("replace", &self.state_path, e))?;

        debug!(
            "Saved state serial {} to {}",
            state.serial,
            self.state_path.display()
        );
        Ok(())
    }

    async fn lock(&self, command: &str) -> StoreResult<StateLock> {
        // A half-written or damaged lock counts as held until force-unlocked
        if let Some(held) = self.read_lock().await? {
            if !held.is_stale() {
                return Err(StoreError::Locked(Box::new(held)));
            }
            debug!("Taking over stale lock {} from {}", held.id, held.holder);
            self.clear_lock().await?;
        }

        let lock = StateLock::for_command(command);
        let content = serde_json::to_vec_pretty(&lock)?;
        match self.create_lock_file(&content).await {
            Ok(()) => Ok(lock),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => match self.read_lock().await {
                Ok(Some(winner)) => Err(StoreError::Locked(Box::new(winner))),
                _ => Err(StoreError::io("create", &self.lock_path, e)),
            },
            Err(e) => Err(StoreError::io("create", &self.lock_path, e)),
        }
    }

    async fn unlock(&self, lock: &StateLock) -> StoreResult<()> {
        let held = self
            .read_lock()
            .await?
            .ok_or_else(|| StoreError::NotLocked(lock.id.clone()))?;

        if held.id != lock.id {
            return Err(StoreError::WrongLock {
                wanted: lock.id.clone(),
                held: held.id,
            });
        }

        self.clear_lock().await
    }

    async fn force_unlock(&self, lock_id: &str) -> StoreResult<()> {
        match self.read_lock().await {
            Ok(None) => return Err(StoreError::NotLocked(lock_id.to_string())),
            Ok(Some(held)) if held.id != lock_id => {
                return Err(StoreError::WrongLock {
                    wanted: lock_id.to_string(),
                    held: held.id,
                });
            }
            Err(e) => debug!("Removing unreadable lock: {}", e),
            Ok(Some(_)) => {}
        }

        self.clear_lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ResourceState;
    use chrono::TimeDelta;
    use marmot_core::resource::Attributes;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn store_in(dir: &tempfile::TempDir) -> LocalStore {
        LocalStore::at(dir.path().join(DEFAULT_STATE_FILE))
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.load().await.unwrap().is_none());

        let mut state = StateFile::new();
        state.upsert_resource(ResourceState {
            resource_type: "marmot_asset".to_string(),
            name: "orders".to_string(),
            provider: "marmot".to_string(),
            identifier: Some("a-1".to_string()),
            attributes: Attributes::new(),
        });
        state.increment_serial();
        store.save(&state).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.serial, 1);
        assert_eq!(loaded.resources, state.resources);
        assert!(!dir.path().join("marmot.state.json.tmp").exists());
    }

    #[tokio::test]
    async fn save_rejects_other_lineage() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&StateFile::new()).await.unwrap();

        assert!(matches!(
            store.save(&StateFile::new()).await,
            Err(StoreError::LineageConflict { .. })
        ));
    }

    #[tokio::test]
    async fn damaged_state_file_is_reported() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.state_path(), "{not json").unwrap();

        match store.load().await {
            Err(StoreError::Corrupt { what, .. }) => assert_eq!(what, "state file"),
            other => panic!("expected Corrupt, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn second_run_is_refused_until_unlock() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.lock_path(), dir.path().join("marmot.state.lock"));

        let lock = store.lock("apply").await.unwrap();
        match store.lock("plan").await {
            Err(StoreError::Locked(held)) => assert_eq!(held.id, lock.id),
            other => panic!("expected Locked, got {:?}", other.map(|l| l.id)),
        }

        store.unlock(&lock).await.unwrap();
        let next = store.lock("destroy").await.unwrap();
        assert_eq!(next.command, "destroy");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_runs_get_one_lock() {
        let dir = tempdir().unwrap();
        let store = Arc::new(store_in(&dir));

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.lock("apply").await })
            })
            .collect();

        let mut won = Vec::new();
        for attempt in attempts {
            if let Ok(lock) = attempt.await.unwrap() {
                won.push(lock);
            }
        }
        assert_eq!(won.len(), 1);

        let held = store.read_lock().await.unwrap().unwrap();
        assert_eq!(held.id, won[0].id);
    }

    #[tokio::test]
    async fn stale_lock_is_taken_over() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let stale = StateLock::lasting("apply", TimeDelta::minutes(-1));
        std::fs::write(store.lock_path(), serde_json::to_vec(&stale).unwrap()).unwrap();

        let lock = store.lock("apply").await.unwrap();
        assert_ne!(lock.id, stale.id);
    }

    #[tokio::test]
    async fn damaged_lock_blocks_until_forced() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.lock_path(), "").unwrap();

        assert!(matches!(
            store.lock("apply").await,
            Err(StoreError::Corrupt { what: "lock file", .. })
        ));
        store.force_unlock("anything").await.unwrap();
        assert!(store.lock("apply").await.is_ok());
    }

    #[tokio::test]
    async fn unlock_checks_the_id() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let held = store.lock("apply").await.unwrap();
        let other = StateLock::for_command("apply");

        assert!(matches!(
            store.unlock(&other).await,
            Err(StoreError::WrongLock { .. })
        ));
        store.unlock(&held).await.unwrap();
        assert!(matches!(
            store.unlock(&held).await,
            Err(StoreError::NotLocked(_))
        ));
    }

    #[tokio::test]
    async fn force_unlock_by_id() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let lock = store.lock("apply").await.unwrap();

        assert!(matches!(
            store.force_unlock("not-the-lock").await,
            Err(StoreError::WrongLock { .. })
        ));
        store.force_unlock(&lock.id).await.unwrap();
        assert!(!store.lock_path().exists());
    }
}
