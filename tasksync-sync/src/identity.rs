//! Source ↔ destination item matching.

use tasksync_core::types::Item;

/// Decides whether two items are the same logical work item.
pub trait IdentityKey {
    fn equals(&self, a: &Item, b: &Item) -> bool;
}

/// Exact, case-sensitive display-name equality.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameKey;

impl IdentityKey for NameKey {
    fn equals(&self, a: &Item, b: &Item) -> bool {
        a.name == b.name
    }
}

/// First item in `candidates` that `key` considers equal to `source`.
pub fn find_match<'a, K>(key: &K, source: &Item, candidates: &'a [Item]) -> Option<&'a Item>
where
    K: IdentityKey + ?Sized,
{
    candidates.iter().find(|candidate| key.equals(source, candidate))
}
