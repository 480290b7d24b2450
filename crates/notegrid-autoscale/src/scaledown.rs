//! Scale-down coordination — should this node terminate itself?
//!
//! Among all nodes reporting load, only the one holding the largest
//! priority key may terminate in a given evaluation, so at most one node
//! leaves the fleet per consistent snapshot even though every node runs
//! this same check independently.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

use notegrid_cloud::{ComputeBackend, DEFAULT_CALL_TIMEOUT};
use notegrid_metrics::{ClusterStatsAggregator, METRIC_LOAD};

use crate::priority;

/// Nodes younger than this never terminate; prevents thrashing on
/// freshly started capacity.
const MIN_UPTIME_MINUTES: f64 = 90.0;

pub struct ScaleDownCoordinator {
    stats: ClusterStatsAggregator,
    compute: Option<Arc<dyn ComputeBackend>>,
    call_timeout: Duration,
}

impl ScaleDownCoordinator {
    /// `compute: None` means compute control is disabled and this node
    /// never terminates itself.
    pub fn new(
        stats: ClusterStatsAggregator,
        compute: Option<Arc<dyn ComputeBackend>>,
    ) -> Self {
        Self {
            stats,
            compute,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Set the upper bound applied to the launch-time lookup.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn node_id(&self) -> &str {
        self.stats.gateway().node_id()
    }

    /// Decide whether this node should remove itself from the fleet.
    ///
    /// Recomputed from a fresh snapshot on every call; deterministic for
    /// fixed inputs.
    pub async fn should_terminate(&self) -> bool {
        let Some(compute) = &self.compute else {
            return false;
        };

        let Some(uptime) = self.uptime_minutes(compute).await else {
            debug!("not terminating: uptime unknown");
            return false;
        };
        if uptime < MIN_UPTIME_MINUTES {
            debug!(uptime, "not terminating: below minimum uptime");
            return false;
        }

        let snapshot = self.stats.snapshot(METRIC_LOAD).await;
        if snapshot.len() <= 1 {
            debug!("not terminating: last reporting node");
            return false;
        }

        let ranked = priority::rank(&snapshot);
        match ranked.last() {
            Some((node_id, _)) if node_id == self.node_id() => {
                debug!("terminating: this node holds the largest priority key");
                true
            }
            _ => {
                debug!("not terminating: largest priority key is another node");
                false
            }
        }
    }

    /// Minutes since this node was launched, per the compute backend.
    async fn uptime_minutes(&self, compute: &Arc<dyn ComputeBackend>) -> Option<f64> {
        let node_id = self.node_id();
        let launch = match tokio::time::timeout(
            self.call_timeout,
            compute.launch_time_secs(node_id),
        )
        .await
        {
            Ok(Ok(secs)) => secs,
            Ok(Err(e)) => {
                debug!(node_id, error = %e, "launch time unavailable");
                return None;
            }
            Err(_) => {
                debug!(node_id, "launch time lookup timed out");
                return None;
            }
        };
        Some(epoch_secs().saturating_sub(launch) as f64 / 60.0)
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
