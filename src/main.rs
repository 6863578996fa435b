//! Edge simulator.
//!
//! Serves a Next.js-style build the way the CDN would: every request runs
//! through the origin-request hook, the in-memory object store and the
//! origin-response hook.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ origin-request hook ──▶ redirect / rendered page
//!                                             │
//!                                             ▼
//!                                       object store (200 | 403)
//!                                             │
//!                                             ▼
//!     Client Response ◀────────────── origin-response hook
//!                                             │
//!                                             ▼ (stale ISR page)
//!                                     regeneration queue ──▶ worker ──▶ render engine
//!                                                                   └─▶ object store
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use edge_router::config::{load_config, EdgeConfig};
use edge_router::http::EdgeServer;
use edge_router::lifecycle::{self, Shutdown};
use edge_router::observability::logging;

#[derive(Parser)]
#[command(name = "edge-router")]
#[command(about = "Local simulator for the edge request router", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EdgeConfig::default(),
    };

    logging::init_logging(&config.observability);

    tracing::info!(
        config = ?cli.config,
        bind_address = %config.listener.bind_address,
        manifests = %config.manifests.dir,
        request_timeout_secs = config.timeouts.request_secs,
        "edge-router v0.1.0 starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => edge_router::observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let runtime = lifecycle::assemble(&config).await?;

    let shutdown = Shutdown::new();
    lifecycle::spawn_signal_listener(shutdown.clone());

    let worker = runtime.worker.map(|(worker, messages)| {
        let worker_shutdown = shutdown.subscribe();
        tokio::spawn(worker.run(messages, worker_shutdown))
    });

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = EdgeServer::new(config, runtime.handler, runtime.store);
    let served = server.run(listener, shutdown.clone()).await;

    // The worker follows the server down, including when serving failed
    shutdown.trigger();
    if let Some(worker) = worker {
        if let Err(e) = worker.await {
            tracing::error!(error = %e, "Regeneration worker panicked");
        }
    }

    served?;
    tracing::info!("Shutdown complete");
    Ok(())
}
