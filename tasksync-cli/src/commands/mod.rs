pub mod check;
pub mod pairs;
pub mod sync;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use tasksync_core::config::{self, SyncConfig};
use tasksync_sync::{MemoryStore, TaskStore};

use crate::asana::AsanaStore;

/// Load the pair config from `path`, or from `~/.tasksync/pairs.yaml`.
pub fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    let loaded = match path {
        Some(path) => config::load_from(path),
        None => config::load(),
    };
    loaded.context("failed to load pair config; add one with `tasksync pairs add`")
}

/// The store a command runs against.
pub enum Backend {
    /// Offline: a JSON snapshot loaded into memory, saved back on persist.
    Snapshot { store: MemoryStore, path: PathBuf },
    Asana(AsanaStore),
}

impl Backend {
    pub fn open(snapshot: Option<&Path>) -> Result<Self> {
        match snapshot {
            Some(path) => {
                let store = MemoryStore::load_snapshot(path)
                    .with_context(|| format!("failed to load snapshot {}", path.display()))?;
                Ok(Backend::Snapshot {
                    store,
                    path: path.to_path_buf(),
                })
            }
            None => Ok(Backend::Asana(AsanaStore::from_env()?)),
        }
    }

    pub fn store(&self) -> &dyn TaskStore {
        match self {
            Backend::Snapshot { store, .. } => store,
            Backend::Asana(store) => store,
        }
    }

    pub fn store_mut(&mut self) -> &mut dyn TaskStore {
        match self {
            Backend::Snapshot { store, .. } => store,
            Backend::Asana(store) => store,
        }
    }

    /// Write snapshot state back to disk. Remote stores persist on each call.
    pub fn persist(&self) -> Result<()> {
        if let Backend::Snapshot { store, path } = self {
            store
                .save_snapshot(path)
                .with_context(|| format!("failed to save snapshot {}", path.display()))?;
        }
        Ok(())
    }
}
