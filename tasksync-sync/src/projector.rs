//! Field projection: raw item attributes → canonical [`FieldMap`].

use serde_json::Value;

use tasksync_core::types::{FieldMap, Item, SyncField};

/// Project the syncable fields of `item`, omitting absent and null values.
///
/// `name` comes from [`Item::name`]; an empty name counts as absent.
pub fn project(item: &Item) -> FieldMap {
    SyncField::ALL
        .iter()
        .filter_map(|&field| raw_value(item, field).map(|value| (field, value)))
        .collect()
}

/// Entries of `source` whose value is absent from, or different in,
/// `destination`. Equal-valued keys never appear in the result.
pub fn field_diff(source: &FieldMap, destination: &FieldMap) -> FieldMap {
    source
        .iter()
        .filter(|(field, value)| destination.get(*field) != Some(*value))
        .map(|(field, value)| (*field, value.clone()))
        .collect()
}

fn raw_value(item: &Item, field: SyncField) -> Option<Value> {
    match field {
        SyncField::Name if item.name.is_empty() => None,
        SyncField::Name => Some(Value::String(item.name.clone())),
        _ => item
            .fields
            .get(field.key())
            .filter(|value| !value.is_null())
            .cloned(),
    }
}
