//! notegrid-cloud — narrow interfaces onto the cloud backends.
//!
//! The control plane talks to two external services: a shared metrics
//! store (publish, catalog, trailing averages) and the compute fleet
//! (instance metadata, launch time, terminate). Each is one small trait,
//! independently fakeable for tests; in-memory implementations ship here
//! and back both the test suites and standalone mode.
//!
//! A disabled backend is represented by not constructing one at all
//! (`Option<Arc<dyn …>>` at the call sites), never by an implementation
//! that errors.

pub mod backend;
pub mod error;
pub mod memory;

pub use backend::{ComputeBackend, DIM_NODE_ID, MetricDatapoint, MetricsBackend};
pub use error::{CloudError, CloudResult};
pub use memory::{InMemoryComputeBackend, InMemoryMetricsBackend};

use std::time::Duration;

/// Default upper bound on any single remote backend call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);
