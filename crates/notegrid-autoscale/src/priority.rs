//! Deterministic fleet-wide priority ordering.
//!
//! Both decision procedures break ties across nodes with this one
//! ordering, so every node computes the same ranking from the same
//! snapshot and the fleet agrees on which single node acts without
//! exchanging messages.

use notegrid_metrics::ClusterSnapshot;

/// Composite sort key: integer part of the value, `_`, node id.
///
/// Keys compare as strings, not numbers: a load of 10 orders before a
/// load of 9 because `"1" < "9"`. Fleet fairness downstream depends on
/// exactly this comparator; do not replace it with a numeric one.
pub fn key(node_id: &str, value: f64) -> String {
    format!("{}_{}", value as i64, node_id)
}

/// Snapshot entries sorted by ascending lexicographic [`key`].
pub fn rank(snapshot: &ClusterSnapshot) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = snapshot
        .iter()
        .map(|(node_id, value)| (node_id.clone(), value))
        .collect();
    ranked.sort_by_key(|(node_id, value)| key(node_id, *value));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_concatenates_integer_part_and_node_id() {
        assert_eq!(key("i-1", 42.9), "42_i-1");
        assert_eq!(key("i-1", 0.0), "0_i-1");
    }

    #[test]
    fn ordering_is_lexicographic_not_numeric() {
        // "10_..." < "9_..." even though 9 < 10 numerically.
        assert!(key("i-1", 10.0) < key("i-1", 9.0));
    }

    #[test]
    fn rank_sorts_by_key_ascending() {
        let snapshot: ClusterSnapshot = [
            ("i-a".to_string(), 9.0),
            ("i-b".to_string(), 10.0),
            ("i-c".to_string(), 30.0),
        ]
        .into_iter()
        .collect();

        let ranked = rank(&snapshot);
        let order: Vec<&str> = ranked.iter().map(|(node_id, _)| node_id.as_str()).collect();
        // "10_i-b" < "30_i-c" < "9_i-a".
        assert_eq!(order, vec!["i-b", "i-c", "i-a"]);
    }

    #[test]
    fn node_id_breaks_equal_loads() {
        let snapshot: ClusterSnapshot = [
            ("i-b".to_string(), 5.0),
            ("i-a".to_string(), 5.0),
        ]
        .into_iter()
        .collect();

        let ranked = rank(&snapshot);
        assert_eq!(ranked[0].0, "i-a");
        assert_eq!(ranked[1].0, "i-b");
    }

    #[test]
    fn rank_is_deterministic() {
        let snapshot: ClusterSnapshot = [
            ("i-a".to_string(), 12.5),
            ("i-b".to_string(), 3.0),
            ("i-c".to_string(), 101.0),
        ]
        .into_iter()
        .collect();

        assert_eq!(rank(&snapshot), rank(&snapshot.clone()));
    }
}
