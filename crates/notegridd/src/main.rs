//! notegridd — the NoteGrid daemon.
//!
//! Single binary that assembles the per-node control plane:
//! - Metrics gateway + cluster aggregation
//! - Admission controller (consumed by the request-routing layer)
//! - Scale-down coordinator
//! - Housekeeping loop (session maintenance + idle scale-down)
//!
//! # Usage
//!
//! ```text
//! notegridd standalone --config conf/notegrid.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use note_core::{NodeIdentity, NoteConfig};
use notegrid_autoscale::{AdmissionController, ScaleDownCoordinator};
use notegrid_cloud::{
    ComputeBackend, InMemoryComputeBackend, InMemoryMetricsBackend, MetricsBackend,
};
use notegrid_housekeeping::{ContainerHost, Housekeeper, HousekeepingSettings, InMemorySessions};
use notegrid_metrics::{ClusterStatsAggregator, MetricsGateway};

#[derive(Parser)]
#[command(name = "notegridd", about = "NoteGrid daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run in standalone mode (single node, in-process backends).
    Standalone {
        /// Configuration file. Built-in defaults when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// User overlay merged over the configuration file.
        #[arg(long)]
        user_config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,notegridd=debug,notegrid=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Standalone {
            config,
            user_config,
        } => run_standalone(config, user_config).await,
    }
}

async fn run_standalone(
    config_path: Option<PathBuf>,
    user_config_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    info!("NoteGrid daemon starting in standalone mode");

    // Configuration is read once here and never reloaded.
    let config = match &config_path {
        Some(path) => NoteConfig::load_with_overlay(path, user_config_path.as_deref())?,
        None => NoteConfig::default(),
    };
    let caps = config.capabilities();
    info!(
        ?caps,
        install_id = %config.cloud.install_id,
        "configuration loaded"
    );

    // ── Backends ───────────────────────────────────────────────
    //
    // Standalone mode wires the in-process implementations; cloud
    // deployments embed the library crates with real backends behind
    // the same traits.
    let metrics_backend: Option<Arc<dyn MetricsBackend>> = if caps.metrics {
        Some(Arc::new(InMemoryMetricsBackend::new()))
    } else {
        None
    };
    let compute_backend: Option<Arc<dyn ComputeBackend>> = if caps.compute {
        Some(Arc::new(InMemoryComputeBackend::new(
            NodeIdentity::localhost(),
        )))
    } else {
        None
    };

    // Node identity resolves once at boot and fails fast if the compute
    // backend cannot answer.
    let identity = match &compute_backend {
        Some(compute) => compute.self_identity().await?,
        None => NodeIdentity::localhost(),
    };
    info!(node_id = %identity.id, hostname = %identity.hostname, "node identity resolved");

    // ── Control plane ──────────────────────────────────────────

    let gateway = Arc::new(
        MetricsGateway::new(identity.clone(), &config.cloud.install_id, metrics_backend)
            .with_call_timeout(config.call_timeout()),
    );
    let stats = ClusterStatsAggregator::new(gateway.clone());

    // Consumed synchronously by the request-routing layer before it
    // creates a session container.
    let _admission = AdmissionController::new(stats.clone());
    info!("admission controller initialized");

    let scaledown = ScaleDownCoordinator::new(stats, compute_backend.clone())
        .with_call_timeout(config.call_timeout());
    info!("scale-down coordinator initialized");

    let sessions = Arc::new(InMemorySessions::new(
        gateway.clone(),
        config.num_sessions_max,
    ));
    sessions.publish_container_stats().await;
    info!("container stats published");

    // ── Housekeeping loop ──────────────────────────────────────

    let settings = HousekeepingSettings {
        interval: config.housekeeping_interval(),
        max_age: Duration::from_secs(config.housekeeping.expire_secs),
        inactivity_timeout: Duration::from_secs(config.housekeeping.inactivity_timeout_secs),
        protected_names: config.protected_docknames(),
        scale_down: config.housekeeping.scale_down,
    };
    info!(
        interval_secs = settings.interval.as_secs(),
        scale_down = settings.scale_down,
        "housekeeping configured"
    );

    let housekeeper = Housekeeper::new(
        identity,
        sessions.clone(),
        scaledown,
        compute_backend,
        settings,
    )
    .with_call_timeout(config.call_timeout());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let housekeeping_handle = tokio::spawn(async move {
        housekeeper.run(shutdown_rx).await;
    });

    // Graceful shutdown on Ctrl-C.
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C handler");
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    let _ = housekeeping_handle.await;

    info!("NoteGrid daemon stopped");
    Ok(())
}
