//! Where state lives and how a run locks it

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::local::LocalStore;
use crate::lock::StateLock;
use crate::state::StateFile;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state is busy: {0}")]
    Locked(Box<StateLock>),

    #[error("no lock is held (expected {0})")]
    NotLocked(String),

    #[error("lock {held} is held, not {wanted}")]
    WrongLock { wanted: String, held: String },

    #[error("state lineage {stored} does not match {given}")]
    LineageConflict { stored: String, given: String },

    #[error("{} is not a valid {what}: {source}", .path.display())]
    Corrupt {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid state location: {0}")]
    Location(String),
}

impl StoreError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent home of a [`StateFile`]
#[async_trait]
pub trait StateStore: Send + Sync {
    /// `None` before the first successful apply
    async fn load(&self) -> StoreResult<Option<StateFile>>;

    /// Replaces the stored state; a different lineage is rejected.
    async fn save(&self, state: &StateFile) -> StoreResult<()>;

    /// Takes the lock for `command` unless a live one exists
    async fn lock(&self, command: &str) -> StoreResult<StateLock>;

    async fn unlock(&self, lock: &StateLock) -> StoreResult<()>;

    /// Drops the lock with this id regardless of holder
    async fn force_unlock(&self, lock_id: &str) -> StoreResult<()>;
}

/// Location of the state, as given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    LocalFile(PathBuf),
}

impl StoreLocation {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::LocalFile(path.into())
    }
}

pub fn open_store(location: &StoreLocation) -> StoreResult<Box<dyn StateStore>> {
    match location {
        StoreLocation::LocalFile(path) => {
            if path.as_os_str().is_empty() {
                return Err(StoreError::Location("state path must not be empty".to_string()));
            }
            Ok(Box::new(LocalStore::at(path.clone())))
        }
    }
}
