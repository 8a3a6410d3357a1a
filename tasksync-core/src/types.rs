//! Domain types for task reconciliation.
//!
//! Items, memberships, and comments are snapshots read from a remote task
//! store at the start of a pass. Nothing here talks to the store; these are
//! plain data that the engine compares and turns into mutations.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_id!(
    /// Store-assigned identifier of a workspace.
    WorkspaceId
);
string_id!(
    /// Store-assigned identifier of a collection (project).
    CollectionId
);
string_id!(
    /// Store-assigned identifier of a section inside a collection.
    SectionId
);
string_id!(
    /// Store-assigned identifier of an item (task).
    ItemId
);

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

/// Top-level named container of collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
}

/// A named grouping of items within a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub workspace: WorkspaceId,
}

/// A named subdivision of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Listing entry returned before the full item detail is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSummary {
    pub id: ItemId,
    pub name: String,
}

/// An item's placement as read from the store: which collection, and which
/// section of it (both carried with their names so the section can be
/// looked up by name on another collection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub collection: CollectionId,
    pub section: SectionId,
    pub section_name: String,
}

/// A (collection, section) pair to create or add on a destination item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub collection: CollectionId,
    pub section: SectionId,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.section)
    }
}

/// Who wrote a comment entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommentKind {
    /// Authored by a person; subject to sync.
    #[default]
    Human,
    /// Automated activity-log entry; never read, counted, or copied.
    System,
}

/// A free-text entry attached to an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    #[serde(default)]
    pub kind: CommentKind,
}

impl Comment {
    pub fn human(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: CommentKind::Human,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: CommentKind::System,
        }
    }

    pub fn is_system(&self) -> bool {
        self.kind == CommentKind::System
    }
}

/// Full item snapshot.
///
/// `fields` holds the raw attribute map as the store returned it; it may
/// contain nulls and keys that are never synced. `name` is kept out of the
/// map because it doubles as the matching key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub memberships: Vec<Membership>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Item {
    pub fn summary(&self) -> ItemSummary {
        ItemSummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Field maps
// ---------------------------------------------------------------------------

/// A syncable item attribute. Declaration order is the canonical field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncField {
    Completed,
    CustomFields,
    DueOn,
    DueAt,
    External,
    Hearted,
    Name,
    Notes,
    StartOn,
}

impl SyncField {
    /// Every syncable field, in canonical order.
    pub const ALL: [SyncField; 9] = [
        SyncField::Completed,
        SyncField::CustomFields,
        SyncField::DueOn,
        SyncField::DueAt,
        SyncField::External,
        SyncField::Hearted,
        SyncField::Name,
        SyncField::Notes,
        SyncField::StartOn,
    ];

    /// Key used in raw item attribute maps and in store payloads.
    pub fn key(self) -> &'static str {
        match self {
            SyncField::Completed => "completed",
            SyncField::CustomFields => "custom_fields",
            SyncField::DueOn => "due_on",
            SyncField::DueAt => "due_at",
            SyncField::External => "external",
            SyncField::Hearted => "hearted",
            SyncField::Name => "name",
            SyncField::Notes => "notes",
            SyncField::StartOn => "start_on",
        }
    }
}

impl fmt::Display for SyncField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Canonical field name → value mapping. Never holds `Value::Null`.
pub type FieldMap = BTreeMap<SyncField, Value>;

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// Which passes a configured pair runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// A→B, then B→A.
    #[default]
    Both,
    /// A→B only.
    AToB,
}

/// How much of a matched item the reconciler touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMode {
    /// Create new items and diff-and-apply matched ones.
    #[default]
    Full,
    /// Create new items only; matched items are left untouched.
    CreateOnly,
}

/// How many missing memberships an update adds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MembershipPolicy {
    /// Add only the first missing (collection, section) pair per update.
    #[default]
    FirstMissingOnly,
    /// Add every missing pair, in source order.
    AllMissing,
}

/// What to do when a source section has no like-named destination section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingSectionPolicy {
    /// Fail the pass with a section-not-found error.
    #[default]
    Abort,
    /// Drop that membership, log a warning, and keep going.
    SkipAndLog,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
