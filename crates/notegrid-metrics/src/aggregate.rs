//! Cluster-wide statistics assembled from per-node metrics.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::gateway::MetricsGateway;

/// Point-in-time mapping of node id → metric value.
///
/// Built fresh for every decision, never cached across calls. A node
/// without a recent sample is absent from the snapshot, never present
/// with zero, which would bias every aggregate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterSnapshot {
    nodes: BTreeMap<String, f64>,
}

impl ClusterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node_id: &str, value: f64) {
        self.nodes.insert(node_id.to_string(), value);
    }

    pub fn get(&self, node_id: &str) -> Option<f64> {
        self.nodes.get(node_id).copied()
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Entries in node-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, f64)> {
        self.nodes.iter().map(|(node_id, value)| (node_id, *value))
    }

    /// Arithmetic mean of all present values.
    ///
    /// `None` on an empty snapshot. Callers must branch on it explicitly;
    /// coercing an undefined aggregate to zero would bias decisions.
    pub fn mean(&self) -> Option<f64> {
        if self.nodes.is_empty() {
            return None;
        }
        let sum: f64 = self.nodes.values().sum();
        Some(sum / self.nodes.len() as f64)
    }
}

impl FromIterator<(String, f64)> for ClusterSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

/// Builds cluster snapshots for a named metric through the gateway.
#[derive(Clone)]
pub struct ClusterStatsAggregator {
    gateway: Arc<MetricsGateway>,
}

impl ClusterStatsAggregator {
    pub fn new(gateway: Arc<MetricsGateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &MetricsGateway {
        &self.gateway
    }

    /// Build a fresh snapshot of every reporting node's latest value.
    ///
    /// Nodes whose value is unavailable (no buckets, failed or timed-out
    /// query) are omitted. An empty snapshot is a legitimate result, not
    /// an error.
    pub async fn snapshot(&self, name: &str) -> ClusterSnapshot {
        let mut snapshot = ClusterSnapshot::new();
        for node_id in self.gateway.reporting_nodes(name).await {
            if let Some(value) = self.gateway.latest_average(&node_id, name).await {
                snapshot.insert(&node_id, value);
            }
        }
        debug!(metric = name, nodes = snapshot.len(), "cluster snapshot built");
        snapshot
    }
}
