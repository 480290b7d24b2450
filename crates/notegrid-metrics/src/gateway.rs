//! Metrics gateway — this node's window onto the shared metrics store.
//!
//! Publication is best-effort: the caller never sees a backend failure.
//! Reads fall back to the self-stats cache for this node's own values and
//! treat any backend failure or timeout as "value absent", so a flaky
//! store degrades snapshots instead of failing decisions.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use note_core::NodeIdentity;
use notegrid_cloud::{DEFAULT_CALL_TIMEOUT, DIM_NODE_ID, MetricsBackend};

/// Trailing window queried for a node's latest average.
const STATS_WINDOW: Duration = Duration::from_secs(30 * 60);
/// Bucket width within the window.
const STATS_PERIOD: Duration = Duration::from_secs(60);

/// Publishes this node's metrics and resolves other nodes' values.
///
/// `backend: None` is local/standalone mode: the self-stats cache is the
/// only data source and no remote calls are made.
pub struct MetricsGateway {
    identity: NodeIdentity,
    namespace: String,
    backend: Option<Arc<dyn MetricsBackend>>,
    /// Latest value this node published, per metric. Publish calls race
    /// with admission checks, hence the lock.
    self_stats: RwLock<HashMap<String, f64>>,
    call_timeout: Duration,
}

impl MetricsGateway {
    /// Create a gateway for this node. `namespace` is the install
    /// identifier; samples from distinct installs never mix.
    pub fn new(
        identity: NodeIdentity,
        namespace: &str,
        backend: Option<Arc<dyn MetricsBackend>>,
    ) -> Self {
        Self {
            identity,
            namespace: namespace.to_string(),
            backend,
            self_stats: RwLock::new(HashMap::new()),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Set the upper bound applied to every remote call.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn node_id(&self) -> &str {
        &self.identity.id
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether a shared metrics backend is configured.
    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Publish one of this node's own measurements.
    ///
    /// Always lands in the self-stats cache; forwarded to the backend
    /// (tagged with this node's id) when one is configured. Backend
    /// errors are logged, never propagated.
    pub async fn publish(&self, name: &str, value: f64, unit: &str) {
        self.self_stats
            .write()
            .await
            .insert(name.to_string(), value);

        info!(
            namespace = %self.namespace,
            node_id = %self.identity.id,
            metric = name,
            value,
            unit,
            "metric published"
        );

        let Some(backend) = &self.backend else {
            return;
        };

        let dimensions = self.self_dimensions();
        match tokio::time::timeout(
            self.call_timeout,
            backend.put_metric(&self.namespace, name, unit, value, &dimensions),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(metric = name, error = %e, "metric publish failed"),
            Err(_) => warn!(metric = name, "metric publish timed out"),
        }
    }

    /// Node ids currently reporting a metric in this install's namespace.
    ///
    /// Without a backend this is `{self}` when the cache holds the
    /// metric, otherwise empty. An unknown metric yields an empty set
    /// with a logged warning.
    pub async fn reporting_nodes(&self, name: &str) -> BTreeSet<String> {
        let Some(backend) = &self.backend else {
            if self.self_stats.read().await.contains_key(name) {
                return BTreeSet::from([self.identity.id.clone()]);
            }
            return BTreeSet::new();
        };

        let dims = match tokio::time::timeout(
            self.call_timeout,
            backend.list_dimensions(&self.namespace, name),
        )
        .await
        {
            Ok(Ok(dims)) => dims,
            Ok(Err(e)) => {
                warn!(metric = name, error = %e, "dimension listing failed");
                return BTreeSet::new();
            }
            Err(_) => {
                warn!(metric = name, "dimension listing timed out");
                return BTreeSet::new();
            }
        };

        if dims.is_empty() {
            warn!(namespace = %self.namespace, metric = name, "unknown metric");
            return BTreeSet::new();
        }

        dims.get(DIM_NODE_ID)
            .map(|nodes| nodes.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// A node's most recent trailing-window average for a metric.
    ///
    /// This node's own value is served from the cache without a remote
    /// call. `None` means the value is unavailable (backend disabled, no
    /// recent buckets, or a failed/timed-out query) and the node must be
    /// left out of the snapshot, not treated as zero.
    pub async fn latest_average(&self, node_id: &str, name: &str) -> Option<f64> {
        if node_id == self.identity.id
            && let Some(value) = self.self_stats.read().await.get(name).copied()
        {
            debug!(metric = name, value, "using cached self stat");
            return Some(value);
        }

        let backend = self.backend.as_ref()?;

        let mut dimensions = HashMap::new();
        dimensions.insert(DIM_NODE_ID.to_string(), node_id.to_string());

        let datapoints = match tokio::time::timeout(
            self.call_timeout,
            backend.metric_statistics(
                &self.namespace,
                name,
                &dimensions,
                STATS_WINDOW,
                STATS_PERIOD,
            ),
        )
        .await
        {
            Ok(Ok(points)) => points,
            Ok(Err(e)) => {
                warn!(node_id, metric = name, error = %e, "statistics query failed");
                return None;
            }
            Err(_) => {
                warn!(node_id, metric = name, "statistics query timed out");
                return None;
            }
        };

        // The bucket with the latest timestamp wins.
        datapoints
            .into_iter()
            .max_by_key(|point| point.timestamp_secs)
            .map(|point| point.average)
    }

    fn self_dimensions(&self) -> HashMap<String, String> {
        HashMap::from([(DIM_NODE_ID.to_string(), self.identity.id.clone())])
    }
}
