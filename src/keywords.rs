// src/keywords.rs

use crate::model::KeywordName;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Count every object key at any depth of `tree`, once per occurrence.
///
/// Keys in `blocklist` are left out of the result, but the values underneath
/// them are still walked.
pub fn flat_keys_count(tree: &Value, blocklist: &HashSet<KeywordName>) -> BTreeMap<KeywordName, usize> {
    let mut counts = BTreeMap::new();
    let mut stack = vec![tree];

    while let Some(node) = stack.pop() {
        match node {
            Value::Object(map) => {
                for (key, value) in map {
                    if !blocklist.contains(key) {
                        *counts.entry(key.clone()).or_insert(0) += 1;
                    }
                    stack.push(value);
                }
            }
            Value::Array(items) => stack.extend(items),
            _ => {}
        }
    }

    counts
}
