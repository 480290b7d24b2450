//! notegrid-housekeeping — the periodic maintenance and scale-down loop.
//!
//! A fixed-interval timer (default 5 minutes) drives each node's
//! housekeeping: evict expired and idle session containers via the
//! [`ContainerHost`] collaborator, then, when the node is completely
//! idle and fleet auto-shrink is on, evaluate voluntary scale-down and
//! terminate this instance if it is the fleet's designated candidate.
//!
//! The loop is the only writer of wall-clock-triggered decisions and
//! runs for the lifetime of the process; a watch channel provides the
//! orderly-shutdown hook.

pub mod container;
pub mod housekeeper;
pub mod sessions;

pub use container::ContainerHost;
pub use housekeeper::{Housekeeper, HousekeepingSettings};
pub use sessions::InMemorySessions;
