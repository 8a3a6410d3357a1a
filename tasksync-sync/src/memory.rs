//! In-memory task store.
//!
//! Holds workspaces, collections, sections, and items entirely in memory and
//! records every mutating call in an ordered journal. Backs the engine's
//! tests and the CLI's offline `--snapshot` mode, where the whole store is
//! loaded from and saved back to a JSON document. Saves use the same atomic
//! `.tmp` + rename pattern as the config file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tasksync_core::types::{
    Collection, CollectionId, Comment, FieldMap, Item, ItemId, ItemSummary, Membership, Placement,
    Section, SectionId, SyncField, Workspace, WorkspaceId,
};

use crate::error::{io_err, StoreError, SyncError};
use crate::store::{Mutation, TaskStore};

/// A collection plus its sections and the ordered ids of the items in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredCollection {
    #[serde(flatten)]
    collection: Collection,
    #[serde(default)]
    sections: Vec<Section>,
    #[serde(default)]
    items: Vec<ItemId>,
}

/// A mutation as it was applied, with the id of the item it touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub item: ItemId,
    pub mutation: Mutation,
}

/// Store whose entire state lives in this value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    workspaces: Vec<Workspace>,
    #[serde(default)]
    collections: Vec<StoredCollection>,
    #[serde(default)]
    items: Vec<Item>,
    #[serde(default)]
    next_id: u64,
    #[serde(skip)]
    journal: Vec<JournalEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Seeding
    // -----------------------------------------------------------------------

    pub fn add_workspace(&mut self, name: &str) -> WorkspaceId {
        let id = WorkspaceId::from(self.fresh_id("w"));
        self.workspaces.push(Workspace {
            id: id.clone(),
            name: name.to_string(),
        });
        id
    }

    pub fn add_collection(&mut self, workspace: &WorkspaceId, name: &str) -> CollectionId {
        let id = CollectionId::from(self.fresh_id("p"));
        self.collections.push(StoredCollection {
            collection: Collection {
                id: id.clone(),
                name: name.to_string(),
                workspace: workspace.clone(),
            },
            sections: Vec::new(),
            items: Vec::new(),
        });
        id
    }

    /// Add a section; returns `None` if `collection` is unknown.
    pub fn add_section(&mut self, collection: &CollectionId, name: &str) -> Option<SectionId> {
        let id = SectionId::from(self.fresh_id("s"));
        let stored = self.collections.iter_mut().find(|c| &c.collection.id == collection)?;
        stored.sections.push(Section {
            id: id.clone(),
            name: name.to_string(),
        });
        Some(id)
    }

    /// Insert a pre-built item snapshot and list it under `collection` and
    /// under every collection it has a membership in.
    pub fn insert_item(&mut self, collection: &CollectionId, item: Item) {
        let id = item.id.clone();
        let mut listed_in = vec![collection.clone()];
        listed_in.extend(item.memberships.iter().map(|m| m.collection.clone()));
        self.items.push(item);
        for collection in listed_in {
            self.list_under(&collection, &id);
        }
    }

    /// Generate an id unique within this store.
    pub fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    /// Look up a section id by collection and section name.
    pub fn section_id(&self, collection: &CollectionId, name: &str) -> Option<SectionId> {
        self.stored(collection)?
            .sections
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.id.clone())
    }

    // -----------------------------------------------------------------------
    // Journal
    // -----------------------------------------------------------------------

    /// Every mutation applied since construction (or the last
    /// [`take_journal`](Self::take_journal)), in call order.
    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }

    pub fn take_journal(&mut self) -> Vec<JournalEntry> {
        std::mem::take(&mut self.journal)
    }

    // -----------------------------------------------------------------------
    // Snapshot persistence
    // -----------------------------------------------------------------------

    /// Load a store from a JSON snapshot. The journal starts empty.
    pub fn load_snapshot(path: &Path) -> Result<Self, SyncError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save the store to `path` atomically (`<path>.tmp` then rename).
    pub fn save_snapshot(&self, path: &Path) -> Result<(), SyncError> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(path, e));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn stored(&self, collection: &CollectionId) -> Option<&StoredCollection> {
        self.collections.iter().find(|c| &c.collection.id == collection)
    }

    fn list_under(&mut self, collection: &CollectionId, item: &ItemId) {
        if let Some(stored) = self
            .collections
            .iter_mut()
            .find(|c| &c.collection.id == collection)
        {
            if !stored.items.contains(item) {
                stored.items.push(item.clone());
            }
        }
    }

    fn item_mut(&mut self, id: &ItemId) -> Result<&mut Item, StoreError> {
        self.items
            .iter_mut()
            .find(|i| &i.id == id)
            .ok_or_else(|| not_found("item", id))
    }

    fn membership_for(&self, placement: &Placement) -> Result<Membership, StoreError> {
        let stored = self
            .stored(&placement.collection)
            .ok_or_else(|| not_found("collection", &placement.collection))?;
        let section = stored
            .sections
            .iter()
            .find(|s| s.id == placement.section)
            .ok_or_else(|| not_found("section", &placement.section))?;
        Ok(Membership {
            collection: placement.collection.clone(),
            section: section.id.clone(),
            section_name: section.name.clone(),
        })
    }

    fn record(&mut self, item: &ItemId, mutation: Mutation) {
        self.journal.push(JournalEntry {
            item: item.clone(),
            mutation,
        });
    }
}

impl TaskStore for MemoryStore {
    fn list_workspaces(&self) -> Result<Vec<Workspace>, StoreError> {
        Ok(self.workspaces.clone())
    }

    fn list_collections(&self, workspace: &WorkspaceId) -> Result<Vec<Collection>, StoreError> {
        if !self.workspaces.iter().any(|w| &w.id == workspace) {
            return Err(not_found("workspace", workspace));
        }
        Ok(self
            .collections
            .iter()
            .filter(|c| &c.collection.workspace == workspace)
            .map(|c| c.collection.clone())
            .collect())
    }

    fn list_sections(&self, collection: &CollectionId) -> Result<Vec<Section>, StoreError> {
        self.stored(collection)
            .map(|c| c.sections.clone())
            .ok_or_else(|| not_found("collection", collection))
    }

    fn list_items(&self, collection: &CollectionId) -> Result<Vec<ItemSummary>, StoreError> {
        let stored = self
            .stored(collection)
            .ok_or_else(|| not_found("collection", collection))?;
        stored
            .items
            .iter()
            .map(|id| {
                self.items
                    .iter()
                    .find(|i| &i.id == id)
                    .map(Item::summary)
                    .ok_or_else(|| not_found("item", id))
            })
            .collect()
    }

    fn get_item(&self, item: &ItemId) -> Result<Item, StoreError> {
        self.items
            .iter()
            .find(|i| &i.id == item)
            .cloned()
            .ok_or_else(|| not_found("item", item))
    }

    fn create_item(
        &mut self,
        collection: &CollectionId,
        fields: &FieldMap,
        placements: &[Placement],
    ) -> Result<Item, StoreError> {
        if self.stored(collection).is_none() {
            return Err(not_found("collection", collection));
        }
        let memberships = placements
            .iter()
            .map(|p| self.membership_for(p))
            .collect::<Result<Vec<_>, _>>()?;

        let id = ItemId::from(self.fresh_id("t"));
        let mut item = Item {
            id: id.clone(),
            name: String::new(),
            fields: Default::default(),
            memberships,
            comments: Vec::new(),
        };
        apply_fields(&mut item, fields);

        self.insert_item(collection, item.clone());
        self.record(
            &id,
            Mutation::CreateItem {
                fields: fields.clone(),
                placements: placements.to_vec(),
            },
        );
        Ok(item)
    }

    fn update_item(&mut self, item: &ItemId, fields: &FieldMap) -> Result<(), StoreError> {
        apply_fields(self.item_mut(item)?, fields);
        self.record(
            item,
            Mutation::UpdateItem {
                fields: fields.clone(),
            },
        );
        Ok(())
    }

    fn add_membership(&mut self, item: &ItemId, placement: &Placement) -> Result<(), StoreError> {
        let membership = self.membership_for(placement)?;
        let target = self.item_mut(item)?;
        if !target.memberships.contains(&membership) {
            target.memberships.push(membership);
        }
        self.list_under(&placement.collection, item);
        self.record(
            item,
            Mutation::AddMembership {
                placement: placement.clone(),
            },
        );
        Ok(())
    }

    fn add_comment(&mut self, item: &ItemId, text: &str) -> Result<(), StoreError> {
        self.item_mut(item)?.comments.push(Comment::human(text));
        self.record(
            item,
            Mutation::AddComment {
                text: text.to_string(),
            },
        );
        Ok(())
    }
}

fn apply_fields(item: &mut Item, fields: &FieldMap) {
    for (field, value) in fields {
        match (field, value) {
            (SyncField::Name, Value::String(name)) => item.name = name.clone(),
            _ => {
                item.fields.insert(field.key().to_string(), value.clone());
            }
        }
    }
}

fn not_found(kind: &'static str, id: &impl ToString) -> StoreError {
    StoreError::NotFound {
        kind,
        id: id.to_string(),
    }
}
