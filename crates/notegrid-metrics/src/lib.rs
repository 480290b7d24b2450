//! notegrid-metrics — per-node metric publication and cluster aggregation.
//!
//! Every node publishes its own measurements through the
//! [`MetricsGateway`] and reads everyone else's back through the
//! [`ClusterStatsAggregator`]. Decisions downstream (admission control,
//! scale-down) consume the resulting [`ClusterSnapshot`].
//!
//! # Architecture
//!
//! ```text
//! MetricsGateway
//!   ├── publish()          ← this node's own samples (best-effort)
//!   ├── reporting_nodes()  → node ids currently reporting a metric
//!   └── latest_average()   → one node's trailing-window average
//!
//! ClusterStatsAggregator
//!   ├── snapshot()         → ClusterSnapshot (node id → value)
//!   └── ClusterSnapshot::mean()
//! ```

pub mod aggregate;
pub mod gateway;

pub use aggregate::{ClusterSnapshot, ClusterStatsAggregator};
pub use gateway::MetricsGateway;

/// Per-node load percentage, the metric every fleet decision reads.
pub const METRIC_LOAD: &str = "Load";
