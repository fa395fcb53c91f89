//! # OCI Instance Launcher
//!
//! Keeps requesting an OCI compute instance until capacity frees up.
//!
//! ## Overview
//!
//! Free-tier and popular shapes are often out of capacity. The launcher:
//!
//! 1. **Loads configuration** from the environment (optionally seeded from a `.env` file)
//! 2. **Signs and sends** `LaunchInstance` requests to the regional Compute API
//! 3. **Adapts its pace**: every HTTP 429 adds one second to the delay between attempts
//! 4. **Exposes Prometheus metrics** on `/metrics` (port 2223 by default)
//!
//! The loop never exits on its own. SIGINT or SIGTERM stop it gracefully; a
//! failing metrics server stops it and the process exits non-zero.
//!
//! ## Usage
//!
//! ```bash
//! oci-instance-launcher --env-file .env
//! oci-instance-launcher --env-file .env --dry-run
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use oci_instance_launcher::backoff::{BackoffController, BackoffState, CadencePolicy};
use oci_instance_launcher::config::{LaunchConfig, LauncherConfig};
use oci_instance_launcher::observability::{self, PrometheusRecorder};
use oci_instance_launcher::provider::oci::ComputeClient;
use oci_instance_launcher::provider::LaunchInstanceDetails;
use oci_instance_launcher::runtime::{RetryLoop, RunContext};
use oci_instance_launcher::server::{self, ServerState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Capacity-seeking OCI compute instance launcher
#[derive(Parser, Debug)]
#[command(name = "oci-instance-launcher", version, about, long_about = None)]
struct Cli {
    /// Load environment variables from this dotenv file before reading configuration
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Print the LaunchInstance request body and exit without calling OCI
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.env_file {
        dotenvy::from_path(path)
            .with_context(|| format!("Failed to load env file {}", path.display()))?;
    }

    let launcher_config = LauncherConfig::from_env();
    observability::init_logging(&launcher_config)
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to initialize logging")?;

    info!(
        git_hash = env!("BUILD_GIT_HASH"),
        built_at = env!("BUILD_DATETIME"),
        "Starting OCI Instance Launcher"
    );

    let launch_config = LaunchConfig::from_env();
    let details = LaunchInstanceDetails::from_config(&launch_config);

    if cli.dry_run {
        let body = serde_json::to_string_pretty(&details)
            .context("Failed to serialize LaunchInstance request")?;
        println!("{body}");
        return Ok(());
    }

    observability::register_metrics().context("Failed to register metrics")?;

    let client = ComputeClient::new(&launch_config, launcher_config.compute_endpoint.as_deref())
        .context("Failed to create OCI compute client")?;

    let backoff = Arc::new(BackoffState::new(
        launcher_config.initial_delay_secs,
        chrono::Utc::now(),
    ));
    let server_state = Arc::new(ServerState::new(Arc::clone(&backoff)));

    let ctx = RunContext::new();
    let signal_task = ctx.stop_on_signal();

    let listener = server::bind(launcher_config.metrics_port)
        .await
        .with_context(|| {
            format!(
                "Failed to bind metrics listener on port {}",
                launcher_config.metrics_port
            )
        })?;
    let server_task = ctx.spawn_critical(
        "metrics-server",
        server::serve(listener, Arc::clone(&server_state), ctx.clone()),
    );

    let controller = BackoffController::new(
        backoff,
        CadencePolicy::from_config(&launcher_config),
        Arc::new(PrometheusRecorder),
    );
    let retry_loop = RetryLoop::new(
        Arc::new(client),
        controller,
        details,
        launcher_config.attempts_per_call,
    );

    server_state.set_ready(true);
    let stats = retry_loop.run(&ctx).await;
    server_state.set_ready(false);

    // The loop only returns once the context is stopped: by a signal, or by
    // the metrics server failing
    ctx.stop();
    signal_task.abort();

    info!(
        calls = stats.calls,
        attempts = stats.attempts,
        "OCI Instance Launcher stopped"
    );

    server_task
        .await
        .context("HTTP server task panicked")?
        .context("HTTP server failed")
}
