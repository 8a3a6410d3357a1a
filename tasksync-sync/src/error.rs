//! Error types for tasksync-sync.

use std::path::PathBuf;

use thiserror::Error;

use tasksync_core::types::CollectionId;

/// Failure reported by a [`TaskStore`](crate::store::TaskStore) implementation.
///
/// The engine never inspects these; they are wrapped in [`SyncError::Store`]
/// and propagated unchanged. Retry and backoff belong to the adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network, TLS, or timeout failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote answered with a non-success status.
    #[error("remote returned {status}: {message}")]
    Api { status: u16, message: String },

    /// A referenced object does not exist in the store.
    #[error("{kind} {id} not found in store")]
    NotFound { kind: &'static str, id: String },

    /// A response body could not be decoded.
    #[error("could not decode store response: {0}")]
    Decode(String),
}

/// All errors that can arise from a reconciliation run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A configured workspace name matched no workspace.
    #[error("workspace '{name}' not found")]
    WorkspaceNotFound { name: String },

    /// A configured collection name matched no collection in its workspace.
    #[error("collection '{collection}' not found in workspace '{workspace}'")]
    CollectionNotFound {
        workspace: String,
        collection: String,
    },

    /// A source item sits in a section that the destination does not have.
    #[error("section '{section}' not found in destination collection {collection} (item '{item}')")]
    SectionNotFound {
        section: String,
        collection: CollectionId,
        item: String,
    },

    /// The remote store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot JSON serialization/deserialization error.
    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
