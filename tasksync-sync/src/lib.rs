//! # tasksync-sync
//!
//! Reconciliation engine for paired task collections.
//!
//! Call [`run_pair`] to bring both sides of one configured pair up to date,
//! or [`run_all`] to process every configured pair. The engine talks to the
//! remote tracker only through [`TaskStore`]; [`MemoryStore`] is the
//! in-process implementation used for tests and offline snapshots.

pub mod comments;
pub mod error;
pub mod identity;
pub mod membership;
pub mod memory;
pub mod pipeline;
pub mod projector;
pub mod reconciler;
pub mod resolve;
pub mod store;

pub use error::{StoreError, SyncError};
pub use identity::{IdentityKey, NameKey};
pub use memory::{JournalEntry, MemoryStore};
pub use pipeline::{
    preflight, run_all, run_pair, MissingSection, PairOverrides, PairReport, PairResult,
    PreflightReport,
};
pub use reconciler::{ItemOutcome, ItemPlan, ItemStatus, PassReport, ReconcileOptions, Reconciler};
pub use resolve::{resolve_endpoint, ResolvedEndpoint};
pub use store::{fetch_items, Mutation, TaskStore};
