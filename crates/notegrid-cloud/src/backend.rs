//! Backend traits for the shared metrics store and the compute fleet.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use note_core::NodeIdentity;

use crate::error::CloudResult;

/// Dimension key under which every node tags its own metric samples.
pub const DIM_NODE_ID: &str = "NodeId";

/// One period-bucketed average returned by the metrics store.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDatapoint {
    /// Bucket timestamp, seconds since the Unix epoch.
    pub timestamp_secs: u64,
    /// Average of the samples that fell into this bucket.
    pub average: f64,
}

/// The shared metrics store (abstracted cloud-monitoring API).
#[async_trait]
pub trait MetricsBackend: Send + Sync {
    /// Store one sample of a custom metric.
    async fn put_metric(
        &self,
        namespace: &str,
        name: &str,
        unit: &str,
        value: f64,
        dimensions: &HashMap<String, String>,
    ) -> CloudResult<()>;

    /// Dimension catalog for a metric: dimension key → reporting values.
    ///
    /// An unknown metric yields an empty map, not an error.
    async fn list_dimensions(
        &self,
        namespace: &str,
        name: &str,
    ) -> CloudResult<HashMap<String, Vec<String>>>;

    /// Trailing-window, period-bucketed averages for one dimension filter.
    async fn metric_statistics(
        &self,
        namespace: &str,
        name: &str,
        dimensions: &HashMap<String, String>,
        window: Duration,
        period: Duration,
    ) -> CloudResult<Vec<MetricDatapoint>>;
}

/// Compute fleet control (abstracted cloud-compute API).
#[async_trait]
pub trait ComputeBackend: Send + Sync {
    /// Identity of the instance this process runs on, from instance
    /// metadata.
    async fn self_identity(&self) -> CloudResult<NodeIdentity>;

    /// Launch time of an instance, seconds since the Unix epoch.
    async fn launch_time_secs(&self, node_id: &str) -> CloudResult<u64>;

    /// Terminate an instance.
    async fn terminate(&self, node_id: &str) -> CloudResult<()>;
}
