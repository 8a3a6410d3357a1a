//! Pair pipeline shared by `tasksync sync` and `tasksync check`.
//!
//! A pair is two configured collections. [`run_pair`] reconciles A into B
//! and, for bidirectional pairs, B into A. The second pass re-reads both
//! collections, so it sees the first pass's writes.

use serde::Serialize;

use tasksync_core::config::{PairConfig, SyncConfig};
use tasksync_core::types::{Direction, ReconcileMode};

use crate::error::SyncError;
use crate::membership::find_section;
use crate::reconciler::{PassReport, ReconcileOptions, Reconciler};
use crate::resolve::{resolve_endpoint, ResolvedEndpoint};
use crate::store::{fetch_items, TaskStore};

/// Run-time switches layered over a pair's configured policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PairOverrides {
    pub dry_run: bool,
    /// Force [`ReconcileMode::CreateOnly`] regardless of config.
    pub create_only: bool,
}

impl PairOverrides {
    fn options_for(self, pair: &PairConfig) -> ReconcileOptions {
        let mut options = ReconcileOptions::for_pair(pair);
        options.dry_run = self.dry_run;
        if self.create_only {
            options.mode = ReconcileMode::CreateOnly;
        }
        options
    }
}

/// Every pass run for one pair, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairReport {
    pub label: String,
    pub passes: Vec<PassReport>,
}

impl PairReport {
    pub fn mutation_count(&self) -> usize {
        self.passes.iter().map(PassReport::mutation_count).sum()
    }
}

/// Outcome of one configured pair within [`run_all`].
#[derive(Debug)]
pub struct PairResult {
    pub label: String,
    pub result: Result<PairReport, SyncError>,
}

/// Reconcile a single pair.
pub fn run_pair<S: TaskStore + ?Sized>(
    store: &mut S,
    pair: &PairConfig,
    overrides: PairOverrides,
) -> Result<PairReport, SyncError> {
    let a = resolve_endpoint(&*store, &pair.a)?;
    let b = resolve_endpoint(&*store, &pair.b)?;
    let options = overrides.options_for(pair);

    let mut passes = vec![Reconciler::new(&mut *store, options).run(&a, &b)?];
    if pair.direction == Direction::Both {
        passes.push(Reconciler::new(&mut *store, options).run(&b, &a)?);
    }
    Ok(PairReport {
        label: pair.label(),
        passes,
    })
}

/// Reconcile every configured pair in order. A failing pair is logged and
/// reported; the remaining pairs still run.
pub fn run_all<S: TaskStore + ?Sized>(
    store: &mut S,
    config: &SyncConfig,
    overrides: PairOverrides,
) -> Vec<PairResult> {
    config
        .pairs
        .iter()
        .map(|pair| {
            let result = run_pair(&mut *store, pair, overrides);
            if let Err(e) = &result {
                tracing::error!("pair {} failed: {e}", pair.label());
            }
            PairResult {
                label: pair.label(),
                result,
            }
        })
        .collect()
}

/// A source section with no like-named section on the destination side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingSection {
    pub source: String,
    pub destination: String,
    pub section: String,
    /// How many source items are in that section.
    pub items: usize,
}

/// Setup problems found for one pair without mutating anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreflightReport {
    pub label: String,
    pub missing_sections: Vec<MissingSection>,
}

impl PreflightReport {
    pub fn is_clean(&self) -> bool {
        self.missing_sections.is_empty()
    }
}

/// Resolve both endpoints and list every section that a pass would fail on
/// under the default missing-section policy.
///
/// Sections nobody uses are still listed (with `items == 0`); they only
/// matter once an item moves into them.
pub fn preflight<S: TaskStore + ?Sized>(
    store: &S,
    pair: &PairConfig,
) -> Result<PreflightReport, SyncError> {
    let a = resolve_endpoint(store, &pair.a)?;
    let b = resolve_endpoint(store, &pair.b)?;

    let mut missing_sections = missing_between(store, &a, &b)?;
    if pair.direction == Direction::Both {
        missing_sections.extend(missing_between(store, &b, &a)?);
    }
    Ok(PreflightReport {
        label: pair.label(),
        missing_sections,
    })
}

fn missing_between<S: TaskStore + ?Sized>(
    store: &S,
    source: &ResolvedEndpoint,
    destination: &ResolvedEndpoint,
) -> Result<Vec<MissingSection>, SyncError> {
    let missing: Vec<_> = source
        .sections
        .iter()
        .filter(|section| find_section(&destination.sections, &section.name).is_none())
        .collect();
    if missing.is_empty() {
        return Ok(Vec::new());
    }

    let items = fetch_items(store, &source.collection.id)?;
    Ok(missing
        .into_iter()
        .map(|section| MissingSection {
            source: source.label(),
            destination: destination.label(),
            section: section.name.clone(),
            items: items
                .iter()
                .filter(|item| item.memberships.iter().any(|m| m.section == section.id))
                .count(),
        })
        .collect())
}
