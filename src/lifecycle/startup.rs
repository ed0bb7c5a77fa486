//! Startup orchestration.
//!
//! # Responsibilities
//! - Assemble the active config from whatever fragments are on disk
//! - Start the proxy against it
//! - Put the node in rotation only if the proxy started
//!
//! # Design Decisions
//! - A failed step is logged, not fatal: the API stays up so an operator
//!   can fix fragments and retry `start` through it
//! - The node is never marked live when the proxy did not start

use serde::Serialize;

use crate::service::ConductorService;

/// What `bootstrap` achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    pub config_ready: bool,
    pub proxy_started: bool,
    pub live: bool,
}

/// Regenerate → start proxy → set live.
pub async fn bootstrap(service: &ConductorService) -> BootstrapReport {
    let mut report = BootstrapReport {
        config_ready: false,
        proxy_started: false,
        live: false,
    };

    match service.regenerate_config().await {
        Ok(outcome) => {
            report.config_ready = true;
            tracing::info!(changed = outcome.reload_needed, "Active config ready");
        }
        Err(e) => tracing::error!(error = %e, "Initial config assembly failed, starting with the existing active config"),
    }

    if let Err(e) = service.start_proxy().await {
        tracing::error!(error = %e, "Proxy did not start, node stays out of rotation");
        return report;
    }
    report.proxy_started = true;

    match service.set_live() {
        Ok(()) => report.live = true,
        Err(e) => tracing::error!(error = %e, "Failed to create the liveness marker"),
    }

    tracing::info!(?report, "Bootstrap complete");
    report
}
