//! Session container collaborator interface.

use std::time::Duration;

use async_trait::async_trait;

/// The container lifecycle manager this control plane drives.
///
/// Production deployments implement this over the real container
/// runtime (create/expire/backup live there); [`crate::InMemorySessions`]
/// ships for standalone mode and tests.
#[async_trait]
pub trait ContainerHost: Send + Sync {
    /// Evict sessions older than `max_age` (zero disables the age check)
    /// or idle longer than `inactivity_timeout`. Sessions named in
    /// `protected_names` are never evicted.
    async fn maintain(
        &self,
        max_age: Duration,
        inactivity_timeout: Duration,
        protected_names: &[String],
    ) -> anyhow::Result<()>;

    /// Number of running session containers.
    async fn num_active(&self) -> usize;

    /// Number of stopped-but-not-removed session containers.
    async fn num_stopped(&self) -> usize;

    /// Record session liveness, called by the request layer on ping.
    async fn record_ping(&self, session_key: &str);

    /// Publish this node's container statistics. Called once at process
    /// start, before the housekeeping loop begins.
    async fn publish_container_stats(&self);
}
