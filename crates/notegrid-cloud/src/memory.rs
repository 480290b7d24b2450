//! In-memory backends for standalone mode and tests.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use note_core::NodeIdentity;

use crate::backend::{ComputeBackend, DIM_NODE_ID, MetricDatapoint, MetricsBackend};
use crate::error::{CloudError, CloudResult};

/// (namespace, metric, node) key for stored samples.
type SampleKey = (String, String, String);

/// Metrics store held entirely in process memory.
///
/// Keeps every published sample per (namespace, metric, node), stamped
/// with a monotonic counter so "latest bucket wins" behaves like the real
/// store. Window and period arguments are accepted but not applied; the
/// in-memory store never ages samples out.
#[derive(Clone, Default)]
pub struct InMemoryMetricsBackend {
    samples: Arc<Mutex<HashMap<SampleKey, Vec<MetricDatapoint>>>>,
    clock: Arc<AtomicU64>,
}

impl InMemoryMetricsBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricsBackend for InMemoryMetricsBackend {
    async fn put_metric(
        &self,
        namespace: &str,
        name: &str,
        _unit: &str,
        value: f64,
        dimensions: &HashMap<String, String>,
    ) -> CloudResult<()> {
        let node_id = dimensions
            .get(DIM_NODE_ID)
            .cloned()
            .ok_or_else(|| CloudError::Backend(format!("missing {DIM_NODE_ID} dimension")))?;

        let timestamp_secs = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
        let key = (namespace.to_string(), name.to_string(), node_id);
        self.samples
            .lock()
            .await
            .entry(key)
            .or_default()
            .push(MetricDatapoint {
                timestamp_secs,
                average: value,
            });
        Ok(())
    }

    async fn list_dimensions(
        &self,
        namespace: &str,
        name: &str,
    ) -> CloudResult<HashMap<String, Vec<String>>> {
        let samples = self.samples.lock().await;
        let nodes: BTreeSet<String> = samples
            .keys()
            .filter(|(ns, metric, _)| ns == namespace && metric == name)
            .map(|(_, _, node_id)| node_id.clone())
            .collect();

        if nodes.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(HashMap::from([(
            DIM_NODE_ID.to_string(),
            nodes.into_iter().collect(),
        )]))
    }

    async fn metric_statistics(
        &self,
        namespace: &str,
        name: &str,
        dimensions: &HashMap<String, String>,
        _window: Duration,
        _period: Duration,
    ) -> CloudResult<Vec<MetricDatapoint>> {
        let node_id = dimensions
            .get(DIM_NODE_ID)
            .cloned()
            .ok_or_else(|| CloudError::Backend(format!("missing {DIM_NODE_ID} dimension")))?;

        let key = (namespace.to_string(), name.to_string(), node_id);
        let samples = self.samples.lock().await;
        Ok(samples.get(&key).cloned().unwrap_or_default())
    }
}

/// Compute backend held entirely in process memory.
///
/// Records terminate calls instead of acting on them so tests (and
/// standalone smoke runs) can observe the decision.
pub struct InMemoryComputeBackend {
    identity: NodeIdentity,
    launch_times: Mutex<HashMap<String, u64>>,
    terminated: Mutex<Vec<String>>,
}

impl InMemoryComputeBackend {
    /// Create a backend whose own instance launched just now.
    pub fn new(identity: NodeIdentity) -> Self {
        let launch_times =
            HashMap::from([(identity.id.clone(), epoch_secs())]);
        Self {
            identity,
            launch_times: Mutex::new(launch_times),
            terminated: Mutex::new(Vec::new()),
        }
    }

    /// Override the recorded launch time of a node.
    pub async fn set_launch_time(&self, node_id: &str, launch_secs: u64) {
        self.launch_times
            .lock()
            .await
            .insert(node_id.to_string(), launch_secs);
    }

    /// Node ids terminate() has been called with, in call order.
    pub async fn terminated(&self) -> Vec<String> {
        self.terminated.lock().await.clone()
    }
}

#[async_trait]
impl ComputeBackend for InMemoryComputeBackend {
    async fn self_identity(&self) -> CloudResult<NodeIdentity> {
        Ok(self.identity.clone())
    }

    async fn launch_time_secs(&self, node_id: &str) -> CloudResult<u64> {
        self.launch_times
            .lock()
            .await
            .get(node_id)
            .copied()
            .ok_or_else(|| CloudError::MetadataUnavailable(node_id.to_string()))
    }

    async fn terminate(&self, node_id: &str) -> CloudResult<()> {
        debug!(%node_id, "recording terminate call");
        self.terminated.lock().await.push(node_id.to_string());
        Ok(())
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
