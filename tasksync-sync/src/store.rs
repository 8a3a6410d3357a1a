//! Remote task store capability interface.
//!
//! The engine reads and mutates a remote task tracker only through this
//! trait. A store handle is constructed once per run by the caller and passed
//! in; there is no global client.

use tasksync_core::types::{
    Collection, CollectionId, FieldMap, Item, ItemId, ItemSummary, Placement, Section, Workspace,
    WorkspaceId,
};

use crate::error::StoreError;

/// Operations the reconciler needs from a task tracker.
///
/// Reads are side-effect free. Each mutation is either fully applied or not
/// applied; implementations own pagination, auth, timeouts, and retry.
pub trait TaskStore {
    fn list_workspaces(&self) -> Result<Vec<Workspace>, StoreError>;

    fn list_collections(&self, workspace: &WorkspaceId) -> Result<Vec<Collection>, StoreError>;

    fn list_sections(&self, collection: &CollectionId) -> Result<Vec<Section>, StoreError>;

    /// Items of a collection, in collection order.
    fn list_items(&self, collection: &CollectionId) -> Result<Vec<ItemSummary>, StoreError>;

    /// Full detail including memberships and comments (system entries
    /// included and flagged).
    fn get_item(&self, item: &ItemId) -> Result<Item, StoreError>;

    fn create_item(
        &mut self,
        collection: &CollectionId,
        fields: &FieldMap,
        placements: &[Placement],
    ) -> Result<Item, StoreError>;

    /// Overwrite exactly the keys present in `fields`.
    fn update_item(&mut self, item: &ItemId, fields: &FieldMap) -> Result<(), StoreError>;

    fn add_membership(&mut self, item: &ItemId, placement: &Placement) -> Result<(), StoreError>;

    fn add_comment(&mut self, item: &ItemId, text: &str) -> Result<(), StoreError>;
}

/// Fetch every item of `collection` in full, preserving collection order.
pub fn fetch_items<S: TaskStore + ?Sized>(
    store: &S,
    collection: &CollectionId,
) -> Result<Vec<Item>, StoreError> {
    store
        .list_items(collection)?
        .iter()
        .map(|summary| store.get_item(&summary.id))
        .collect()
}

/// One mutating store call, as planned by the reconciler and as recorded by
/// [`MemoryStore`](crate::memory::MemoryStore).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    CreateItem {
        fields: FieldMap,
        placements: Vec<Placement>,
    },
    UpdateItem {
        fields: FieldMap,
    },
    AddMembership {
        placement: Placement,
    },
    AddComment {
        text: String,
    },
}

impl Mutation {
    /// Short operation name for logs and tables.
    pub fn op(&self) -> &'static str {
        match self {
            Mutation::CreateItem { .. } => "create",
            Mutation::UpdateItem { .. } => "update",
            Mutation::AddMembership { .. } => "add-membership",
            Mutation::AddComment { .. } => "add-comment",
        }
    }
}
