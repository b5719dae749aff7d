//! Marmot State Management
//!
//! Persists the stored state of managed catalog entities between runs, with
//! a lock file guarding against concurrent modification.
//!
//! # Overview
//!
//! - **StateFile**: all managed resources, in the order they were first stored
//! - **StateStore**: where the state lives; [`LocalStore`] keeps it on disk
//! - **StateLock**: the lock held while a command runs
//!
//! # Example
//!
//! ```ignore
//! use marmot_state::{open_store, StoreLocation};
//!
//! let store = open_store(&StoreLocation::local("marmot.state.json"))?;
//!
//! let lock = store.lock("apply").await?;
//! let mut state = store.load().await?.unwrap_or_default();
//!
//! // ... apply changes, upserting and removing resources ...
//!
//! state.increment_serial();
//! store.save(&state).await?;
//! store.unlock(&lock).await?;
//! ```

pub mod local;
pub mod lock;
pub mod state;
pub mod store;

pub use local::LocalStore;
pub use lock::StateLock;
pub use state::{ResourceState, StateFile};
pub use store::{StateStore, StoreError, StoreLocation, StoreResult, open_store};
