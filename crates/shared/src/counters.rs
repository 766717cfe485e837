//! Monotonic counter helpers.
//!
//! Counters only ever grow: a bump initializes an absent counter to one and
//! increments an existing one. Merging adds counts key by key, which makes
//! folding order irrelevant.

use std::collections::BTreeMap;

/// A named set of counters with deterministic (sorted) iteration order.
pub type Counts = BTreeMap<String, u64>;

/// Bump the counter stored under `key`.
pub fn bump(counts: &mut Counts, key: &str) {
    match counts.get_mut(key) {
        Some(n) => *n += 1,
        None => {
            counts.insert(key.to_string(), 1);
        }
    }
}

/// Add every counter of `other` into `into`.
pub fn merge_counts(into: &mut Counts, other: Counts) {
    for (key, n) in other {
        *into.entry(key).or_insert(0) += n;
    }
}

/// Merge a map of nested tallies, combining values present on both sides with `combine`.
pub fn merge_nested<V>(
    into: &mut BTreeMap<String, V>,
    other: BTreeMap<String, V>,
    mut combine: impl FnMut(&mut V, V),
) {
    for (key, value) in other {
        match into.get_mut(&key) {
            Some(existing) => combine(existing, value),
            None => {
                into.insert(key, value);
            }
        }
    }
}
