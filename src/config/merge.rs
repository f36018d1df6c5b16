//! Deep merge of YAML values
//!
//! Nested mappings merge recursively; any other collision takes the value
//! from the right-hand side. Merging a value with itself returns it unchanged.
//! Binary merges are applied left to right when combining many values, so no
//! associativity guarantee is made across three-way merges.

use serde_yaml::{Mapping, Value};

/// Merge `other` into `base`, `other` winning on conflicts
pub fn deep_merge(base: &mut Value, other: Value) {
    match (base, other) {
        (Value::Mapping(base_map), Value::Mapping(other_map)) => {
            deep_merge_mappings(base_map, other_map);
        }
        (base, other) => *base = other,
    }
}

/// Merge the entries of `other` into `base`, `other` winning on conflicts
pub fn deep_merge_mappings(base: &mut Mapping, other: Mapping) {
    for (key, value) in other {
        match base.get_mut(&key) {
            Some(existing) if existing.is_mapping() && value.is_mapping() => {
                deep_merge(existing, value);
            }
            Some(existing) => *existing = value,
            None => {
                base.insert(key, value);
            }
        }
    }
}
