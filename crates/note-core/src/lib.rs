//! note-core — shared types and configuration for NoteGrid.
//!
//! NoteGrid is the per-node control plane of a multi-node hosted-notebook
//! service. Every node runs the same process; coordination happens through
//! a shared metrics store and a deterministic priority ordering, never
//! through a central coordinator. This crate holds what every other crate
//! needs: the node identity, the backend capability set, and the
//! configuration surface read once at boot.

pub mod config;
pub mod types;

pub use config::{CloudConfig, HousekeepingConfig, NoteConfig};
pub use types::*;
