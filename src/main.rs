//! Reverse-proxy reload conductor (daemon)
//!
//! Control plane for a fragment-assembled proxy configuration. Orchestrators
//! push route batches; the conductor renders them into fragments, assembles
//! and validates the active config, and coordinates reloads of the proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────────┐
//!                        │                   RELOAD CONDUCTOR                   │
//!                        │                                                      │
//!   Orchestrator         │  ┌─────────┐    ┌──────────────────────────────┐     │
//!   ─────────────────────┼─▶│  http   │───▶│  service (single-writer gate)│     │
//!   POST /v1/routes      │  │  api    │    └──────┬─────────┬─────────┬───┘     │
//!                        │  └─────────┘           │         │         │         │
//!                        │                        ▼         ▼         ▼         │
//!                        │               ┌──────────┐ ┌─────────┐ ┌──────────┐  │
//!                        │               │fragments │ │assembly │ │coordina- │  │
//!                        │               │ store +  │─▶ config. │ │tor lock/ │  │
//!                        │               │ renderer │ │ active  │ │queue/reg │  │
//!                        │               └──────────┘ └────┬────┘ └────┬─────┘  │
//!                        │                                 │           │        │
//!                        │                                 ▼           ▼        │
//!                        │                          ┌──────────────────────┐    │
//!                        │                          │ proxy (validate /    │────┼──▶ haproxy
//!                        │                          │ reload / start/kill) │    │
//!                        │                          └──────────────────────┘    │
//!                        │  ┌────────────────────────────────────────────────┐  │
//!                        │  │ config · observability · lifecycle (scheduler) │  │
//!                        │  └────────────────────────────────────────────────┘  │
//!                        └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use reload_conductor::config::load_config;
use reload_conductor::http::ApiServer;
use reload_conductor::lifecycle::{bootstrap, signals, ReloadScheduler, Shutdown};
use reload_conductor::observability::{logging, metrics};
use reload_conductor::proxy::{CommandProxy, ProxyControl};
use reload_conductor::service::ConductorService;

#[derive(Parser, Debug)]
#[command(name = "reload-conductor", version, about = "Reverse-proxy reload conductor")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    logging::init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "reload-conductor starting");
    tracing::info!(
        conf_dir = %config.paths.conf_dir.display(),
        proxy_dir = %config.paths.proxy_dir.display(),
        bind_address = %config.listener.bind_address,
        scheduler = config.reload_schedule.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let proxy: Arc<dyn ProxyControl> = Arc::new(CommandProxy::new(config.proxy.clone()));
    let service = Arc::new(ConductorService::open(&config.paths, proxy)?);

    bootstrap(&service).await;

    let shutdown = Shutdown::new();
    let mut tasks = Vec::new();

    if config.reload_schedule.enabled {
        let scheduler = ReloadScheduler::new(
            service.clone(),
            Duration::from_secs(config.reload_schedule.interval_secs),
        );
        let rx = shutdown.subscribe();
        tasks.push(tokio::spawn(scheduler.run(rx)));
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = ApiServer::new(service, &config);
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    signals::wait_for_termination().await;
    shutdown.trigger();

    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Background task panicked");
        }
    }
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
