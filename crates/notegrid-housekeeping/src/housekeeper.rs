//! Housekeeping loop — periodic maintenance and idle scale-down.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};

use note_core::NodeIdentity;
use notegrid_autoscale::ScaleDownCoordinator;
use notegrid_cloud::{ComputeBackend, DEFAULT_CALL_TIMEOUT};

use crate::container::ContainerHost;

/// Settings for the housekeeping loop, read once at boot.
#[derive(Debug, Clone)]
pub struct HousekeepingSettings {
    /// Time between ticks.
    pub interval: Duration,
    /// Maximum total session age handed to maintenance (zero disables).
    pub max_age: Duration,
    /// Inactivity eviction threshold handed to maintenance.
    pub inactivity_timeout: Duration,
    /// Escaped container names maintenance never evicts.
    pub protected_names: Vec<String>,
    /// Fleet auto-shrink: evaluate self-termination on idle ticks.
    pub scale_down: bool,
}

/// Drives container maintenance and, when the node is idle, the
/// scale-down evaluation.
pub struct Housekeeper {
    identity: NodeIdentity,
    container: Arc<dyn ContainerHost>,
    scaledown: ScaleDownCoordinator,
    compute: Option<Arc<dyn ComputeBackend>>,
    settings: HousekeepingSettings,
    call_timeout: Duration,
}

impl Housekeeper {
    pub fn new(
        identity: NodeIdentity,
        container: Arc<dyn ContainerHost>,
        scaledown: ScaleDownCoordinator,
        compute: Option<Arc<dyn ComputeBackend>>,
        settings: HousekeepingSettings,
    ) -> Self {
        Self {
            identity,
            container,
            scaledown,
            compute,
            settings,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Set the upper bound applied to the terminate call.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// One maintenance + scale-down cycle.
    ///
    /// Returns `true` when this node terminated itself. A maintenance
    /// failure is the collaborator's concern: it is logged and the
    /// scale-down evaluation still runs.
    pub async fn tick(&self) -> bool {
        if let Err(e) = self
            .container
            .maintain(
                self.settings.max_age,
                self.settings.inactivity_timeout,
                &self.settings.protected_names,
            )
            .await
        {
            error!(error = %e, "container maintenance failed");
        }

        if !self.settings.scale_down {
            return false;
        }

        let active = self.container.num_active().await;
        let stopped = self.container.num_stopped().await;
        if active > 0 || stopped > 0 {
            return false;
        }

        if !self.scaledown.should_terminate().await {
            return false;
        }

        let Some(compute) = &self.compute else {
            return false;
        };

        info!(node_id = %self.identity.id, "terminating to scale down");
        match tokio::time::timeout(self.call_timeout, compute.terminate(&self.identity.id))
            .await
        {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!(error = %e, "terminate request failed");
                false
            }
            Err(_) => {
                error!("terminate request timed out");
                false
            }
        }
    }

    /// Run the housekeeping loop until the shutdown signal.
    ///
    /// Runs for the lifetime of the process; the watch channel is the
    /// orderly-shutdown hook and drains the in-flight tick.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.settings.interval.as_secs(),
            "housekeeping started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.settings.interval) => {
                    if self.tick().await {
                        info!("housekeeping loop exiting after self-termination");
                        break;
                    }
                }
                _ = shutdown.changed() => {
                    info!("housekeeping shutting down");
                    break;
                }
            }
        }
    }
}
