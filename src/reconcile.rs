//! Count-map reconciliation between an exported dataset and the live store.

use serde::Serialize;
use std::collections::BTreeMap;

/// One discrepancy between expected (dataset) and actual (database) counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountDiff {
    pub key: String,
    pub expected: i64,
    pub actual: i64,
    pub delta: i64,
}

/// Diff two count maps over the symmetric union of their keys. A key missing
/// from either side counts as zero; exact matches are omitted. Output is
/// sorted by key.
pub fn diff_counts(
    expected: &BTreeMap<String, i64>,
    actual: &BTreeMap<String, i64>,
) -> Vec<CountDiff> {
    let mut keys: BTreeMap<&str, ()> = BTreeMap::new();
    for key in expected.keys().chain(actual.keys()) {
        keys.insert(key, ());
    }

    keys.keys()
        .filter_map(|&key| {
            let expected_count = expected.get(key).copied().unwrap_or(0);
            let actual_count = actual.get(key).copied().unwrap_or(0);
            if expected_count == actual_count {
                return None;
            }
            Some(CountDiff {
                key: key.to_string(),
                expected: expected_count,
                actual: actual_count,
                delta: actual_count - expected_count,
            })
        })
        .collect()
}

/// Render one diff line the way the verify report prints it.
pub fn format_diff(entry: &CountDiff) -> String {
    let sign = if entry.delta >= 0 { "+" } else { "" };
    format!(
        "- {}: dataset={}, d1={} (Δ {}{})",
        entry.key, entry.expected, entry.actual, sign, entry.delta
    )
}
