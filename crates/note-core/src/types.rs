//! Shared types used across NoteGrid crates.

use serde::{Deserialize, Serialize};

/// Identity of the node this process runs on.
///
/// Resolved once during boot (from instance metadata when compute
/// control is enabled, otherwise `localhost`) and passed to every
/// component that needs it. Never re-resolved after startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    /// Globally unique identifier of this instance.
    pub id: String,
    /// Public endpoint the routing layer advertises for this node.
    pub hostname: String,
}

impl NodeIdentity {
    /// Identity used when no compute backend is available (local mode).
    pub fn localhost() -> Self {
        Self {
            id: "localhost".to_string(),
            hostname: "localhost".to_string(),
        }
    }
}

/// Backend capability set, fixed at process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    /// Shared metrics store is reachable.
    pub metrics: bool,
    /// Compute fleet control (metadata, terminate) is reachable.
    pub compute: bool,
    /// Object storage for session backups is reachable.
    pub object_store: bool,
}

/// Escape a user identifier into a session/container name.
///
/// `@` and `.` are not valid in container names.
// TODO: this escaping can clash (`a.b` and `a_b` map to the same name);
// move to a scheme that round-trips.
pub fn escape_session_name(name: &str) -> String {
    name.replace('@', "_at_").replace('.', "_")
}
