//! Periodic reload cycle.
//!
//! # Responsibilities
//! - Every interval: lock → reload → release
//! - Stop on the shutdown broadcast
//!
//! # Design Decisions
//! - Goes through the same service operations as external callers, so an
//!   external scheduler and this one cannot both own a cycle
//! - `NothingPending` and `Locked` are quiet skips
//! - A failed reload still releases the lock with a failure outcome; the
//!   next cycle starts clean

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::coordinator::ReleaseOutcome;
use crate::error::ConductorError;
use crate::service::ConductorService;

/// What a single cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Skipped,
    Reloaded,
    Failed,
}

/// Background task driving reload cycles.
pub struct ReloadScheduler {
    service: Arc<ConductorService>,
    interval: Duration,
}

impl ReloadScheduler {
    pub fn new(service: Arc<ConductorService>, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// Run cycles until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        tracing::info!(interval = ?self.interval, "Reload scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Reload scheduler stopping");
                    break;
                }
            }
        }
    }

    /// One lock → reload → release cycle.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let cycle = Uuid::new_v4();

        match self.service.lock_for_reload().await {
            Ok(()) => {}
            Err(ConductorError::NothingPending) => {
                tracing::trace!(%cycle, "Nothing pending");
                return CycleOutcome::Skipped;
            }
            Err(ConductorError::Locked) => {
                tracing::debug!(%cycle, "Reload lock held elsewhere, skipping");
                return CycleOutcome::Skipped;
            }
            Err(e) => {
                tracing::error!(%cycle, error = %e, "Failed to take reload lock");
                return CycleOutcome::Failed;
            }
        }

        let (outcome, result) = match self.service.reload().await {
            Ok(report) => {
                tracing::info!(%cycle, change_sets = report.change_sets.len(), "Reload cycle succeeded");
                (ReleaseOutcome::Success, CycleOutcome::Reloaded)
            }
            Err(e) => {
                tracing::error!(%cycle, error = %e, "Reload cycle failed");
                (ReleaseOutcome::Failure, CycleOutcome::Failed)
            }
        };

        if let Err(e) = self.service.release_reload_lock(outcome).await {
            tracing::error!(%cycle, error = %e, "Failed to release reload lock");
            return CycleOutcome::Failed;
        }
        result
    }
}
