//! notegrid-autoscale — fleet decisions without a coordinator.
//!
//! Every node runs the same two decision procedures against the same
//! shared metrics snapshot:
//!
//! - [`AdmissionController::should_accept`]: take this session request,
//!   or let another node have it?
//! - [`ScaleDownCoordinator::should_terminate`]: remove this node from
//!   the fleet to save cost?
//!
//! There is no leader election and no cross-node locking. Agreement on
//! which single node acts rests entirely on the deterministic
//! [`priority`] ordering: every node derives the same ranking from the
//! same snapshot, so at most one node refuses admission and at most one
//! node terminates per consistent snapshot. Brief divergence between
//! nodes' snapshots is tolerated and bounded by the metrics polling
//! window and the housekeeping interval.

pub mod admission;
pub mod priority;
pub mod scaledown;

pub use admission::AdmissionController;
pub use scaledown::ScaleDownCoordinator;
