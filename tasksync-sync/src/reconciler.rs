//! One reconciliation pass: source collection → destination collection.
//!
//! ## Per-item protocol
//!
//! 1. Match the source item against destination items by identity key.
//! 2. Plan (pure): translate memberships, project fields, diff comments.
//!    A missing destination section fails here, before any mutation.
//! 3. Apply the plan in order: create-or-update, memberships, comments.
//!
//! Items are processed one at a time in source order. Nothing is rolled
//! back; re-running the pass applies whatever is still missing.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tasksync_core::config::PairConfig;
use tasksync_core::types::{
    FieldMap, Item, ItemId, MembershipPolicy, MissingSectionPolicy, Placement, ReconcileMode,
};

use crate::comments::{human_comments, missing_comments};
use crate::error::SyncError;
use crate::identity::{find_match, IdentityKey, NameKey};
use crate::membership::{missing_placements, translate, translate_existing};
use crate::projector::{field_diff, project};
use crate::resolve::ResolvedEndpoint;
use crate::store::{fetch_items, Mutation, TaskStore};

// ---------------------------------------------------------------------------
// Options and results
// ---------------------------------------------------------------------------

/// Knobs for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileOptions {
    pub mode: ReconcileMode,
    pub membership: MembershipPolicy,
    pub missing_section: MissingSectionPolicy,
    /// Plan and report without calling any mutating store operation.
    pub dry_run: bool,
}

impl ReconcileOptions {
    /// Options as configured for `pair`, not in dry-run.
    pub fn for_pair(pair: &PairConfig) -> Self {
        Self {
            mode: pair.mode,
            membership: pair.membership_policy,
            missing_section: pair.missing_section,
            dry_run: false,
        }
    }
}

/// Terminal state of a source item within a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// No destination match; a full copy was created.
    Created,
    /// Matched an existing destination item (possibly with nothing to do).
    Reconciled,
}

/// What happened to one source item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemOutcome {
    pub name: String,
    pub status: ItemStatus,
    /// Destination item id; `None` for a create in dry-run.
    pub item: Option<ItemId>,
    pub mutations: Vec<Mutation>,
}

/// Result of a single source → destination pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassReport {
    pub source: String,
    pub destination: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub outcomes: Vec<ItemOutcome>,
}

impl PassReport {
    pub fn created(&self) -> usize {
        self.count(ItemStatus::Created)
    }

    pub fn reconciled(&self) -> usize {
        self.count(ItemStatus::Reconciled)
    }

    /// Total mutations applied (or, in dry-run, planned).
    pub fn mutation_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.mutations.len()).sum()
    }

    /// Items that needed nothing.
    pub fn unchanged(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.mutations.is_empty())
            .count()
    }

    fn count(&self, status: ItemStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// Changes one source item needs, computed without touching the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemPlan {
    Create {
        name: String,
        fields: FieldMap,
        placements: Vec<Placement>,
        comments: Vec<String>,
    },
    Reconcile {
        name: String,
        item: ItemId,
        /// Only the differing keys; empty means no update call.
        fields: FieldMap,
        placements: Vec<Placement>,
        comments: Vec<String>,
    },
}

impl ItemPlan {
    pub fn name(&self) -> &str {
        match self {
            ItemPlan::Create { name, .. } | ItemPlan::Reconcile { name, .. } => name,
        }
    }

    pub fn status(&self) -> ItemStatus {
        match self {
            ItemPlan::Create { .. } => ItemStatus::Created,
            ItemPlan::Reconcile { .. } => ItemStatus::Reconciled,
        }
    }

    /// The store calls this plan makes, in order.
    pub fn mutations(&self) -> Vec<Mutation> {
        let (head, placements, comments) = match self {
            ItemPlan::Create {
                fields,
                placements,
                comments,
                ..
            } => (
                Some(Mutation::CreateItem {
                    fields: fields.clone(),
                    placements: placements.clone(),
                }),
                &[] as &[Placement],
                comments,
            ),
            ItemPlan::Reconcile {
                fields,
                placements,
                comments,
                ..
            } => (
                (!fields.is_empty()).then(|| Mutation::UpdateItem {
                    fields: fields.clone(),
                }),
                placements.as_slice(),
                comments,
            ),
        };
        head.into_iter()
            .chain(placements.iter().map(|placement| Mutation::AddMembership {
                placement: placement.clone(),
            }))
            .chain(comments.iter().map(|text| Mutation::AddComment { text: text.clone() }))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Drives a pass against an explicitly passed-in store handle.
pub struct Reconciler<'s, S: TaskStore + ?Sized, K: IdentityKey = NameKey> {
    store: &'s mut S,
    key: K,
    options: ReconcileOptions,
}

impl<'s, S: TaskStore + ?Sized> Reconciler<'s, S, NameKey> {
    /// A reconciler matching items by exact name.
    pub fn new(store: &'s mut S, options: ReconcileOptions) -> Self {
        Self {
            store,
            key: NameKey,
            options,
        }
    }
}

impl<'s, S: TaskStore + ?Sized, K: IdentityKey> Reconciler<'s, S, K> {
    /// Swap the identity strategy.
    pub fn with_key<K2: IdentityKey>(self, key: K2) -> Reconciler<'s, S, K2> {
        Reconciler {
            store: self.store,
            key,
            options: self.options,
        }
    }

    /// Bring `destination` up to a superset of `source`.
    ///
    /// Both collections are read in full up front. A destination item is
    /// claimed by the first source item that matches it and is not offered
    /// to later ones, so same-named source items each get their own copy.
    pub fn run(
        &mut self,
        source: &ResolvedEndpoint,
        destination: &ResolvedEndpoint,
    ) -> Result<PassReport, SyncError> {
        let started_at = Utc::now();
        let source_items = fetch_items(&*self.store, &source.collection.id)?;
        let mut unclaimed = fetch_items(&*self.store, &destination.collection.id)?;
        tracing::info!(
            "reconciling {} ({} items) into {} ({} items){}",
            source.label(),
            source_items.len(),
            destination.label(),
            unclaimed.len(),
            if self.options.dry_run { " [dry-run]" } else { "" }
        );

        let mut outcomes = Vec::with_capacity(source_items.len());
        for item in &source_items {
            let plan = self.plan_item(item, &unclaimed, destination)?;
            if let ItemPlan::Reconcile { item: matched, .. } = &plan {
                unclaimed.retain(|candidate| &candidate.id != matched);
            }
            outcomes.push(self.apply(&plan, destination)?);
        }

        Ok(PassReport {
            source: source.label(),
            destination: destination.label(),
            started_at,
            finished_at: Utc::now(),
            dry_run: self.options.dry_run,
            outcomes,
        })
    }

    /// Decide what `source` needs on the destination. Pure: no store calls.
    pub fn plan_item(
        &self,
        source: &Item,
        candidates: &[Item],
        destination: &ResolvedEndpoint,
    ) -> Result<ItemPlan, SyncError> {
        let matched = find_match(&self.key, source, candidates);
        if let (Some(existing), ReconcileMode::CreateOnly) = (matched, self.options.mode) {
            tracing::debug!("'{}' exists as {}; create-only, skipping", source.name, existing.id);
            return Ok(ItemPlan::Reconcile {
                name: source.name.clone(),
                item: existing.id.clone(),
                fields: FieldMap::new(),
                placements: Vec::new(),
                comments: Vec::new(),
            });
        }

        let dest_collection = &destination.collection.id;
        let wanted = translate(
            source,
            dest_collection,
            &destination.sections,
            self.options.missing_section,
        )?;
        let fields = project(source);
        let source_comments = human_comments(source);

        let Some(existing) = matched else {
            tracing::debug!("'{}' has no match in {}", source.name, destination.label());
            return Ok(ItemPlan::Create {
                name: source.name.clone(),
                fields,
                placements: wanted,
                comments: source_comments.into_iter().map(str::to_owned).collect(),
            });
        };

        tracing::debug!("'{}' matched {}", source.name, existing.id);
        let have = translate_existing(existing, dest_collection, &destination.sections);
        Ok(ItemPlan::Reconcile {
            name: source.name.clone(),
            item: existing.id.clone(),
            fields: field_diff(&fields, &project(existing)),
            placements: missing_placements(&wanted, &have, self.options.membership),
            comments: missing_comments(&source_comments, &human_comments(existing))
                .into_iter()
                .map(str::to_owned)
                .collect(),
        })
    }

    fn apply(
        &mut self,
        plan: &ItemPlan,
        destination: &ResolvedEndpoint,
    ) -> Result<ItemOutcome, SyncError> {
        let mutations = plan.mutations();
        let name = plan.name().to_string();

        if self.options.dry_run {
            for mutation in &mutations {
                tracing::info!("[dry-run] would {} '{}'", mutation.op(), name);
            }
            let item = match plan {
                ItemPlan::Create { .. } => None,
                ItemPlan::Reconcile { item, .. } => Some(item.clone()),
            };
            return Ok(ItemOutcome {
                name,
                status: plan.status(),
                item,
                mutations,
            });
        }

        let (item, placements, comments) = match plan {
            ItemPlan::Create {
                fields,
                placements,
                comments,
                ..
            } => {
                let created =
                    self.store
                        .create_item(&destination.collection.id, fields, placements)?;
                tracing::info!(
                    "created '{}' as {} in {}",
                    name,
                    created.id,
                    destination.label()
                );
                (created.id, &[] as &[Placement], comments)
            }
            ItemPlan::Reconcile {
                item,
                fields,
                placements,
                comments,
                ..
            } => {
                if !fields.is_empty() {
                    self.store.update_item(item, fields)?;
                    tracing::info!("updated {} field(s) on '{}'", fields.len(), name);
                }
                (item.clone(), placements.as_slice(), comments)
            }
        };

        for placement in placements {
            self.store.add_membership(&item, placement)?;
            tracing::info!("added '{}' to {}", name, placement);
        }
        for text in comments {
            self.store.add_comment(&item, text)?;
            tracing::info!("copied comment to '{}'", name);
        }

        Ok(ItemOutcome {
            name,
            status: plan.status(),
            item: Some(item),
            mutations,
        })
    }
}
