//! Admission control — should this node accept a new session?
//!
//! Invoked by the request-routing layer before it creates a session
//! container, potentially from many in-flight requests at once. The
//! decision is recomputed from a fresh snapshot on every call and is
//! deterministic for fixed inputs. A rejection means "route this session
//! to another node"; retrying is the routing layer's job.

use tracing::debug;

use notegrid_metrics::{ClusterSnapshot, ClusterStatsAggregator, METRIC_LOAD};

use crate::priority;

/// Hard per-node ceiling on the Load metric.
const MAX_LOAD: f64 = 100.0;

pub struct AdmissionController {
    stats: ClusterStatsAggregator,
}

impl AdmissionController {
    pub fn new(stats: ClusterStatsAggregator) -> Self {
        Self { stats }
    }

    /// Decide whether this node should accept a new session right now.
    ///
    /// Among the nodes at or above the cluster-average load, at most the
    /// one holding the smallest priority key refuses; every other state
    /// accepts. Nodes at or above the average accept unconditionally;
    /// that early accept is deliberate, not a bug to invert.
    pub async fn should_accept(&self) -> bool {
        let gateway = self.stats.gateway();
        let self_id = gateway.node_id().to_string();

        // An unavailable self load compares as below any threshold.
        let self_load = gateway.latest_average(&self_id, METRIC_LOAD).await;
        debug!(?self_load, "self load");

        if self_load.is_some_and(|load| load >= MAX_LOAD) {
            debug!("rejecting: at capacity ceiling");
            return false;
        }

        if !gateway.is_enabled() {
            return true;
        }

        let snapshot = self.stats.snapshot(METRIC_LOAD).await;
        let Some(avg) = snapshot.mean() else {
            debug!("accepting: no cluster load data");
            return true;
        };
        debug!(nodes = snapshot.len(), avg, "cluster load");

        if self_load.is_some_and(|load| load >= avg) {
            debug!("accepting: self load at or above cluster average");
            return true;
        }

        let contenders: ClusterSnapshot = snapshot
            .iter()
            .filter(|(_, value)| *value >= avg)
            .map(|(node_id, value)| (node_id.clone(), value))
            .collect();

        if contenders.len() == 1 {
            debug!("accepting: single node at or above average");
            return true;
        }

        let ranked = priority::rank(&contenders);
        match ranked.first() {
            Some((node_id, _)) if *node_id != self_id => {
                debug!(head = %node_id, "accepting: smallest priority key is another node");
                true
            }
            Some(_) => {
                debug!("rejecting: this node holds the smallest priority key");
                false
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use note_core::NodeIdentity;
    use notegrid_cloud::InMemoryMetricsBackend;
    use notegrid_metrics::MetricsGateway;

    fn backed_gateway(id: &str, backend: &InMemoryMetricsBackend) -> Arc<MetricsGateway> {
        let identity = NodeIdentity {
            id: id.to_string(),
            hostname: format!("{id}.example.com"),
        };
        Arc::new(MetricsGateway::new(
            identity,
            "NoteGrid",
            Some(Arc::new(backend.clone())),
        ))
    }

    /// Publish each node's load and return an admission controller whose
    /// "self" is `self_id`.
    async fn controller_for(
        self_id: &str,
        loads: &[(&str, f64)],
        backend: &InMemoryMetricsBackend,
    ) -> AdmissionController {
        for (node_id, load) in loads {
            backed_gateway(node_id, backend)
                .publish(METRIC_LOAD, *load, "Percent")
                .await;
        }
        AdmissionController::new(ClusterStatsAggregator::new(backed_gateway(
            self_id, backend,
        )))
    }

    #[tokio::test]
    async fn capacity_ceiling_rejects_regardless_of_cluster() {
        let backend = InMemoryMetricsBackend::new();
        let controller =
            controller_for("i-a", &[("i-a", 100.0), ("i-b", 0.0)], &backend).await;
        assert!(!controller.should_accept().await);
    }

    #[tokio::test]
    async fn ceiling_applies_in_local_mode_too() {
        let gateway = Arc::new(MetricsGateway::new(
            NodeIdentity::localhost(),
            "NoteGrid",
            None,
        ));
        gateway.publish(METRIC_LOAD, 100.0, "Percent").await;

        let controller =
            AdmissionController::new(ClusterStatsAggregator::new(gateway));
        assert!(!controller.should_accept().await);
    }

    #[tokio::test]
    async fn local_mode_accepts_below_ceiling() {
        let gateway = Arc::new(MetricsGateway::new(
            NodeIdentity::localhost(),
            "NoteGrid",
            None,
        ));
        gateway.publish(METRIC_LOAD, 55.0, "Percent").await;

        let controller =
            AdmissionController::new(ClusterStatsAggregator::new(gateway));
        assert!(controller.should_accept().await);
    }

    #[tokio::test]
    async fn empty_snapshot_falls_back_to_accept() {
        // Backend enabled, but no node reports the metric at all.
        let backend = InMemoryMetricsBackend::new();
        let controller = AdmissionController::new(ClusterStatsAggregator::new(
            backed_gateway("i-a", &backend),
        ));
        assert!(controller.should_accept().await);
    }

    #[tokio::test]
    async fn below_average_with_single_contender_accepts() {
        // {A:5, B:5, C:30}, avg ≈ 13.33. A is below average; the only
        // node at or above average is C, so A accepts.
        let backend = InMemoryMetricsBackend::new();
        let controller = controller_for(
            "i-a",
            &[("i-a", 5.0), ("i-b", 5.0), ("i-c", 30.0)],
            &backend,
        )
        .await;
        assert!(controller.should_accept().await);
    }

    #[tokio::test]
    async fn at_or_above_average_accepts_early() {
        // {A:50, B:20}, avg = 35. A's load is above average → accept.
        let backend = InMemoryMetricsBackend::new();
        let controller =
            controller_for("i-a", &[("i-a", 50.0), ("i-b", 20.0)], &backend).await;
        assert!(controller.should_accept().await);
    }

    #[tokio::test]
    async fn below_average_counterpart_also_accepts() {
        // Same cluster, B's view: load 20 < avg 35; contenders = {A},
        // a single node → accept.
        let backend = InMemoryMetricsBackend::new();
        let controller =
            controller_for("i-b", &[("i-a", 50.0), ("i-b", 20.0)], &backend).await;
        assert!(controller.should_accept().await);
    }

    #[tokio::test]
    async fn decision_is_deterministic() {
        let backend = InMemoryMetricsBackend::new();
        let controller = controller_for(
            "i-a",
            &[("i-a", 5.0), ("i-b", 5.0), ("i-c", 30.0)],
            &backend,
        )
        .await;

        let first = controller.should_accept().await;
        for _ in 0..5 {
            assert_eq!(controller.should_accept().await, first);
        }
    }
}
