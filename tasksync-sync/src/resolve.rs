//! Endpoint resolution: configured names → store objects.
//!
//! Lookups return `Option`; [`resolve_endpoint`] is where not-found becomes
//! fatal for a pair.

use tasksync_core::config::CollectionRef;
use tasksync_core::types::{Collection, Section, Workspace};

use crate::error::SyncError;
use crate::store::TaskStore;

/// A configured collection resolved against the store, with its sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub workspace: Workspace,
    pub collection: Collection,
    pub sections: Vec<Section>,
}

impl ResolvedEndpoint {
    /// `workspace/collection` label for logs and reports.
    pub fn label(&self) -> String {
        format!("{}/{}", self.workspace.name, self.collection.name)
    }
}

/// First workspace named exactly `name`.
pub fn find_workspace<'a>(workspaces: &'a [Workspace], name: &str) -> Option<&'a Workspace> {
    workspaces.iter().find(|w| w.name == name)
}

/// First collection named exactly `name`.
pub fn find_collection<'a>(collections: &'a [Collection], name: &str) -> Option<&'a Collection> {
    collections.iter().find(|c| c.name == name)
}

/// Resolve `target` to a workspace, collection, and section list.
///
/// Fails with [`SyncError::WorkspaceNotFound`] or
/// [`SyncError::CollectionNotFound`] when a name has no match.
pub fn resolve_endpoint<S: TaskStore + ?Sized>(
    store: &S,
    target: &CollectionRef,
) -> Result<ResolvedEndpoint, SyncError> {
    let workspaces = store.list_workspaces()?;
    let workspace = find_workspace(&workspaces, &target.workspace)
        .cloned()
        .ok_or_else(|| SyncError::WorkspaceNotFound {
            name: target.workspace.clone(),
        })?;

    let collections = store.list_collections(&workspace.id)?;
    let collection = find_collection(&collections, &target.collection)
        .cloned()
        .ok_or_else(|| SyncError::CollectionNotFound {
            workspace: target.workspace.clone(),
            collection: target.collection.clone(),
        })?;

    let sections = store.list_sections(&collection.id)?;
    tracing::debug!(
        "resolved {target} to collection {} ({} sections)",
        collection.id,
        sections.len()
    );
    Ok(ResolvedEndpoint {
        workspace,
        collection,
        sections,
    })
}
