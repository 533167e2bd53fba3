//! Deep merging of configuration trees.
//!
//! Mappings merge key by key, sequences concatenate, and every other
//! combination lets the overlay replace the base outright.

use super::value::{ConfigValue, Mapping};

/// Merges `overlay` into `base`, with `overlay` winning on conflicts.
pub fn deep_merge(base: &mut ConfigValue, overlay: ConfigValue) {
    match (base, overlay) {
        (ConfigValue::Mapping(base_map), ConfigValue::Mapping(overlay_map)) => {
            merge_mappings(base_map, overlay_map);
        }
        (ConfigValue::Sequence(base_items), ConfigValue::Sequence(overlay_items)) => {
            base_items.extend(overlay_items);
        }
        (base, overlay) => *base = overlay,
    }
}

fn merge_mappings(base: &mut Mapping, overlay: Mapping) {
    for (key, value) in overlay {
        match base.get_mut(&key) {
            Some(existing) => deep_merge(existing, value),
            None => {
                base.insert(key, value);
            }
        }
    }
}

/// Folds `values` left to right into an initially empty mapping.
pub fn deep_merge_all(values: impl IntoIterator<Item = ConfigValue>) -> ConfigValue {
    values
        .into_iter()
        .fold(ConfigValue::empty_mapping(), |mut acc, value| {
            deep_merge(&mut acc, value);
            acc
        })
}

/// Merges `value` at the nested key `path` of `base`.
///
/// Intermediate entries that are missing or not mappings are replaced by
/// empty mappings. An empty path merges at the root.
pub fn merge_at_path(base: &mut ConfigValue, path: &[String], value: ConfigValue) {
    let Some((first, rest)) = path.split_first() else {
        deep_merge(base, value);
        return;
    };

    if !matches!(base, ConfigValue::Mapping(_)) {
        *base = ConfigValue::empty_mapping();
    }

    if let ConfigValue::Mapping(map) = base {
        if rest.is_empty() {
            match map.get_mut(first) {
                Some(existing) => deep_merge(existing, value),
                None => {
                    map.insert(first.clone(), value);
                }
            }
            return;
        }

        let nested = map
            .entry(first.clone())
            .or_insert_with(ConfigValue::empty_mapping);
        merge_at_path(nested, rest, value);
    }
}
