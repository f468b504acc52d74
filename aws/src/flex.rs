//! Conversions between Terraform block values and plain Rust values

use std::collections::HashMap;
use tfplug::Dynamic;

pub type BlockMap = HashMap<String, Dynamic>;

/// The object inside a `max_items = 1` block, `None` when the block is absent
pub fn first_block(value: &Dynamic) -> Option<&BlockMap> {
    value.as_list()?.first()?.as_map()
}

/// String field of a block, empty when missing or null
pub fn string_field(block: &BlockMap, name: &str) -> String {
    block
        .get(name)
        .and_then(Dynamic::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Non-empty string field of a block
pub fn opt_string_field(block: &BlockMap, name: &str) -> Option<String> {
    block
        .get(name)
        .and_then(Dynamic::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Set-of-strings field of a block, sorted
pub fn string_set_field(block: &BlockMap, name: &str) -> Vec<String> {
    block.get(name).map(Dynamic::to_string_set).unwrap_or_default()
}

/// Build a block map from `(name, value)` pairs
pub fn block<const N: usize>(fields: [(&str, Dynamic); N]) -> BlockMap {
    fields
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Copy of `value` with every unknown replaced by null, for state written
/// back after a partially failed apply
pub fn unknown_as_null(value: &Dynamic) -> Dynamic {
    match value {
        Dynamic::Unknown => Dynamic::Null,
        Dynamic::List(items) => Dynamic::List(items.iter().map(unknown_as_null).collect()),
        Dynamic::Map(fields) => Dynamic::Map(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), unknown_as_null(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}
