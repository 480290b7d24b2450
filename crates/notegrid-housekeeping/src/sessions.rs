//! In-memory session host for standalone mode and tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use notegrid_metrics::{METRIC_LOAD, MetricsGateway};

use crate::container::ContainerHost;

const METRIC_ACTIVE: &str = "NumActiveContainers";
const METRIC_STOPPED: &str = "NumStoppedContainers";

/// Per-session bookkeeping.
struct SessionSlot {
    started: Instant,
    last_ping: Instant,
    stopped: bool,
}

/// Tracks interactive sessions in process memory.
///
/// Eviction is two-phase, like a real container runtime that backs a
/// session up before removing it: a maintenance pass stops expired and
/// idle sessions, and the next pass removes what was already stopped.
/// Container statistics (including the Load metric every fleet decision
/// reads) are republished after each pass.
pub struct InMemorySessions {
    gateway: Arc<MetricsGateway>,
    /// session name → slot.
    sessions: Mutex<HashMap<String, SessionSlot>>,
    /// Session capacity of this node; Load = active / capacity × 100.
    capacity: u32,
}

impl InMemorySessions {
    pub fn new(gateway: Arc<MetricsGateway>, capacity: u32) -> Self {
        Self {
            gateway,
            sessions: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Register a session as started. In production the container
    /// runtime does this when it creates the container.
    pub async fn start_session(&self, session_key: &str) {
        let now = Instant::now();
        self.sessions.lock().await.insert(
            session_key.to_string(),
            SessionSlot {
                started: now,
                last_ping: now,
                stopped: false,
            },
        );
        info!(session = session_key, "session started");
    }

    async fn counts(&self) -> (usize, usize) {
        let sessions = self.sessions.lock().await;
        let stopped = sessions.values().filter(|slot| slot.stopped).count();
        (sessions.len() - stopped, stopped)
    }
}

#[async_trait]
impl ContainerHost for InMemorySessions {
    async fn maintain(
        &self,
        max_age: Duration,
        inactivity_timeout: Duration,
        protected_names: &[String],
    ) -> anyhow::Result<()> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;

        // Remove what the previous pass stopped.
        sessions.retain(|_, slot| !slot.stopped);

        for (name, slot) in sessions.iter_mut() {
            if protected_names.iter().any(|protected| protected == name) {
                continue;
            }
            let expired =
                !max_age.is_zero() && now.duration_since(slot.started) >= max_age;
            let idle = now.duration_since(slot.last_ping) >= inactivity_timeout;
            if expired || idle {
                info!(session = %name, expired, idle, "stopping session");
                slot.stopped = true;
            }
        }
        drop(sessions);

        self.publish_container_stats().await;
        Ok(())
    }

    async fn num_active(&self) -> usize {
        self.counts().await.0
    }

    async fn num_stopped(&self) -> usize {
        self.counts().await.1
    }

    async fn record_ping(&self, session_key: &str) {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(session_key) {
            Some(slot) => slot.last_ping = Instant::now(),
            None => debug!(session = session_key, "ping for unknown session"),
        }
    }

    async fn publish_container_stats(&self) {
        let (active, stopped) = self.counts().await;
        let load = active as f64 * 100.0 / self.capacity as f64;

        self.gateway
            .publish(METRIC_ACTIVE, active as f64, "Count")
            .await;
        self.gateway
            .publish(METRIC_STOPPED, stopped as f64, "Count")
            .await;
        self.gateway.publish(METRIC_LOAD, load, "Percent").await;
    }
}
