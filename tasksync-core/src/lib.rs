//! tasksync core library — domain types, pair configuration, errors.
//!
//! - [`types`] — ids, items, memberships, comments, field maps, policies
//! - [`config`] — load / save / add collection pairs
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{CollectionRef, PairConfig, SyncConfig};
pub use error::ConfigError;
pub use types::{
    Collection, CollectionId, Comment, CommentKind, Direction, FieldMap, Item, ItemId,
    ItemSummary, Membership, MembershipPolicy, MissingSectionPolicy, Placement, ReconcileMode,
    Section, SectionId, SyncField, Workspace, WorkspaceId,
};
