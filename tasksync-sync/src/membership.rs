//! Section membership translation between collections.
//!
//! Sections are matched by name. A source membership whose section name has
//! no counterpart in the destination collection is resolved through
//! [`MissingSectionPolicy`]; sections are never created.

use tasksync_core::types::{
    CollectionId, Item, MembershipPolicy, MissingSectionPolicy, Placement, Section,
};

use crate::error::SyncError;

/// Destination section named `name`, if any.
pub fn find_section<'a>(sections: &'a [Section], name: &str) -> Option<&'a Section> {
    sections.iter().find(|section| section.name == name)
}

/// Translate every membership of `item` into a placement in `destination`.
///
/// Output is deduplicated, keeping the first occurrence.
pub fn translate(
    item: &Item,
    destination: &CollectionId,
    sections: &[Section],
    on_missing: MissingSectionPolicy,
) -> Result<Vec<Placement>, SyncError> {
    let mut placements = Vec::new();
    for membership in &item.memberships {
        let Some(section) = find_section(sections, &membership.section_name) else {
            match on_missing {
                MissingSectionPolicy::Abort => {
                    return Err(SyncError::SectionNotFound {
                        section: membership.section_name.clone(),
                        collection: destination.clone(),
                        item: item.name.clone(),
                    });
                }
                MissingSectionPolicy::SkipAndLog => {
                    tracing::warn!(
                        "skipping membership of '{}': no section '{}' in {}",
                        item.name,
                        membership.section_name,
                        destination
                    );
                    continue;
                }
            }
        };
        push_unique(&mut placements, placement(destination, section));
    }
    Ok(placements)
}

/// Translate the destination item's own memberships, ignoring any whose
/// section name does not exist in `destination`. Those can never equal a
/// translated source placement.
pub fn translate_existing(
    item: &Item,
    destination: &CollectionId,
    sections: &[Section],
) -> Vec<Placement> {
    let mut placements = Vec::new();
    for membership in &item.memberships {
        if let Some(section) = find_section(sections, &membership.section_name) {
            push_unique(&mut placements, placement(destination, section));
        }
    }
    placements
}

/// Placements in `wanted` that are not in `existing`, in `wanted` order,
/// limited by `policy`.
pub fn missing_placements(
    wanted: &[Placement],
    existing: &[Placement],
    policy: MembershipPolicy,
) -> Vec<Placement> {
    let missing = wanted.iter().filter(|p| !existing.contains(p)).cloned();
    match policy {
        MembershipPolicy::FirstMissingOnly => missing.take(1).collect(),
        MembershipPolicy::AllMissing => missing.collect(),
    }
}

fn placement(destination: &CollectionId, section: &Section) -> Placement {
    Placement {
        collection: destination.clone(),
        section: section.id.clone(),
    }
}

fn push_unique(placements: &mut Vec<Placement>, placement: Placement) {
    if !placements.contains(&placement) {
        placements.push(placement);
    }
}
