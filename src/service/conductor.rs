//! The conductor service: every caller-facing operation.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::assembly::{Assembler, Assembly};
use crate::config::PathsConfig;
use crate::coordinator::{ReleaseOutcome, ReloadCoordinator, ReloadReport};
use crate::error::{ConductorError, ConductorResult};
use crate::fragments::{render, FragmentSnapshot, FragmentStore};
use crate::health::{HealthStatus, LivenessMarker};
use crate::model::{Action, ChangeSetId, ChangeSetStatus, ReloadMode, RouteBatch};
use crate::observability::metrics;
use crate::proxy::ProxyControl;

/// How a mutation reached (or will reach) the running proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadDisposition {
    /// Queued for the next reload cycle.
    Queued,
    /// The proxy was reloaded during the call.
    Reloaded,
    /// The active configuration did not change.
    NotNeeded,
}

/// Result of an add/update or remove batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    pub change_set: Option<ChangeSetId>,
    pub config_changed: bool,
    pub reload: ReloadDisposition,
}

/// Result of a full regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegenerateOutcome {
    pub reload_needed: bool,
}

/// Point-in-time view of the coordinator and liveness state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub locked: bool,
    pub pending: Vec<ChangeSetId>,
    /// The active config was installed but its reload failed.
    pub reload_owed: bool,
    pub live: bool,
}

/// State mutated under the single-writer gate.
struct Inner {
    store: FragmentStore,
    assembler: Assembler,
    coordinator: ReloadCoordinator,
}

impl Inner {
    fn ensure_unlocked(&self) -> ConductorResult<()> {
        if self.coordinator.is_locked() {
            return Err(ConductorError::Locked);
        }
        Ok(())
    }

    /// Put fragments and the active file back to their pre-call state.
    /// Cleanup failures are logged; the caller surfaces its original error.
    fn roll_back(&mut self, snapshot: &FragmentSnapshot, assembly: Option<&Assembly>) {
        if let Err(e) = self.store.restore(snapshot) {
            tracing::error!(
                error = %e,
                owners = ?snapshot.owners(),
                "Fragment rollback incomplete"
            );
        }
        if let Some(assembly) = assembly {
            if let Err(e) = self.assembler.restore(assembly) {
                tracing::error!(error = %e, "Active config rollback incomplete");
            }
        }
    }
}

/// Owns the fragment store, assembler and reload coordinator behind one
/// async mutex, plus the proxy collaborator and the liveness marker.
pub struct ConductorService {
    inner: Mutex<Inner>,
    proxy: Arc<dyn ProxyControl>,
    liveness: LivenessMarker,
    active_path: PathBuf,
}

impl ConductorService {
    /// Open the store and coordinator state found on disk.
    pub fn open(paths: &PathsConfig, proxy: Arc<dyn ProxyControl>) -> ConductorResult<Self> {
        let store = FragmentStore::open(&paths.conf_dir)?;
        let coordinator = ReloadCoordinator::open(&paths.proxy_dir)?;
        let assembler = Assembler::new(&paths.proxy_dir);
        let active_path = assembler.active_path().to_path_buf();

        tracing::info!(
            conf_dir = %paths.conf_dir.display(),
            proxy_dir = %paths.proxy_dir.display(),
            "Conductor service opened"
        );

        Ok(Self {
            inner: Mutex::new(Inner {
                store,
                assembler,
                coordinator,
            }),
            proxy,
            liveness: LivenessMarker::new(&paths.live_marker),
            active_path,
        })
    }

    pub fn active_config_path(&self) -> &std::path::Path {
        &self.active_path
    }

    /// Apply upserts (and explicit removals) carried by the batch.
    pub async fn add_or_update_routes(
        &self,
        batch: RouteBatch,
    ) -> ConductorResult<MutationOutcome> {
        self.apply_batch(batch, false).await
    }

    /// Delete every fragment owned by the routes in the batch.
    pub async fn remove_routes(&self, batch: RouteBatch) -> ConductorResult<MutationOutcome> {
        self.apply_batch(batch, true).await
    }

    async fn apply_batch(
        &self,
        batch: RouteBatch,
        force_remove: bool,
    ) -> ConductorResult<MutationOutcome> {
        let mut inner = self.inner.lock().await;
        inner.ensure_unlocked()?;

        if batch.mode == ReloadMode::Batched && batch.id.is_none() {
            return Err(ConductorError::InvalidChangeSet(
                "batched mode requires a change set id".to_string(),
            ));
        }
        for route in &batch.routes {
            if force_remove || route.action == Action::Remove {
                route.validate_id()?;
            } else {
                route.validate()?;
            }
        }

        let snapshot = inner.store.snapshot(batch.routes.iter().map(|r| r.id.as_str()))?;

        for route in &batch.routes {
            if let Err(e) = render::apply_route(&mut inner.store, route, force_remove) {
                inner.roll_back(&snapshot, None);
                return Err(e);
            }
        }

        let assembly = match inner.assembler.generate(&inner.store) {
            Ok(assembly) => assembly,
            Err(e) => {
                inner.roll_back(&snapshot, None);
                return Err(e);
            }
        };

        if assembly.changed {
            if let Err(failure) = self.proxy.validate(&self.active_path).await {
                metrics::record_validation_failure();
                tracing::warn!(
                    change_set = ?batch.id,
                    diagnostic = %failure,
                    "Assembled config rejected, rolling back"
                );
                inner.roll_back(&snapshot, Some(&assembly));
                return Err(ConductorError::ValidationFailed {
                    diagnostic: failure.diagnostic,
                });
            }
        }

        // An earlier immediate reload may have failed after installing.
        let needs_reload = assembly.changed || inner.coordinator.reload_owed();

        let reload = match (batch.mode, &batch.id) {
            (ReloadMode::Batched, Some(id)) => {
                // An unchanged batch still rides a reload that is already due.
                let queue = needs_reload || !inner.coordinator.pending().is_empty();
                let recorded = if queue {
                    inner.coordinator.enqueue(id).map(|_| ReloadDisposition::Queued)
                } else {
                    inner
                        .coordinator
                        .record_applied(id)
                        .map(|_| ReloadDisposition::NotNeeded)
                };
                match recorded {
                    Ok(disposition) => disposition,
                    Err(e) => {
                        inner.roll_back(&snapshot, Some(&assembly));
                        return Err(e);
                    }
                }
            }
            _ if !needs_reload => {
                if let Some(id) = &batch.id {
                    inner.coordinator.record_applied(id)?;
                }
                ReloadDisposition::NotNeeded
            }
            _ => {
                let result = self.proxy.reload().await;
                metrics::record_reload(result.is_ok());
                if let Err(failure) = result {
                    tracing::error!(
                        change_set = ?batch.id,
                        diagnostic = %failure,
                        "Immediate reload failed"
                    );
                    if let Err(e) = inner.coordinator.mark_reload_owed() {
                        tracing::error!(error = %e, "Failed to record the unloaded config");
                    }
                    return Err(ConductorError::Proxy {
                        action: "reload",
                        diagnostic: failure.diagnostic,
                    });
                }
                inner.coordinator.clear_reload_owed()?;
                if let Some(id) = &batch.id {
                    inner.coordinator.record_applied(id)?;
                }
                ReloadDisposition::Reloaded
            }
        };

        tracing::info!(
            change_set = ?batch.id,
            routes = batch.routes.len(),
            changed = assembly.changed,
            reload = ?reload,
            "Route batch applied"
        );

        Ok(MutationOutcome {
            change_set: batch.id,
            config_changed: assembly.changed,
            reload,
        })
    }

    /// Rescan the fragment directory and rebuild the active configuration.
    pub async fn regenerate_config(&self) -> ConductorResult<RegenerateOutcome> {
        let mut inner = self.inner.lock().await;
        inner.ensure_unlocked()?;

        inner.store.rescan()?;
        let assembly = inner.assembler.generate(&inner.store)?;

        if assembly.changed {
            if let Err(failure) = self.proxy.validate(&self.active_path).await {
                metrics::record_validation_failure();
                tracing::warn!(
                    diagnostic = %failure,
                    "Regenerated config rejected, restoring previous"
                );
                if let Err(e) = inner.assembler.restore(&assembly) {
                    tracing::error!(error = %e, "Active config rollback incomplete");
                }
                return Err(ConductorError::ValidationFailed {
                    diagnostic: failure.diagnostic,
                });
            }
        }

        Ok(RegenerateOutcome {
            reload_needed: assembly.changed || inner.coordinator.reload_owed(),
        })
    }

    pub async fn lock_for_reload(&self) -> ConductorResult<()> {
        self.inner.lock().await.coordinator.lock_for_reload()
    }

    pub async fn reload(&self) -> ConductorResult<ReloadReport> {
        let mut inner = self.inner.lock().await;
        inner.coordinator.reload(self.proxy.as_ref()).await
    }

    pub async fn release_reload_lock(&self, outcome: ReleaseOutcome) -> ConductorResult<()> {
        self.inner.lock().await.coordinator.release(outcome)
    }

    pub async fn query_change_set_status(&self, id: &ChangeSetId) -> ChangeSetStatus {
        self.inner.lock().await.coordinator.query(id)
    }

    pub async fn status(&self) -> ServiceStatus {
        let inner = self.inner.lock().await;
        ServiceStatus {
            locked: inner.coordinator.is_locked(),
            pending: inner.coordinator.pending().to_vec(),
            reload_owed: inner.coordinator.reload_owed(),
            live: self.liveness.is_live(),
        }
    }

    pub async fn start_proxy(&self) -> ConductorResult<()> {
        self.proxy
            .start(&self.active_path)
            .await
            .map_err(|failure| ConductorError::Proxy {
                action: "start",
                diagnostic: failure.diagnostic,
            })?;
        tracing::info!(config = %self.active_path.display(), "Proxy started");
        Ok(())
    }

    pub async fn kill_proxy(&self) -> ConductorResult<()> {
        self.proxy.kill().await.map_err(|failure| ConductorError::Proxy {
            action: "kill",
            diagnostic: failure.diagnostic,
        })?;
        tracing::info!("Proxy killed");
        Ok(())
    }

    pub fn set_live(&self) -> ConductorResult<()> {
        self.liveness.set_live()
    }

    pub fn set_not_live(&self) -> ConductorResult<()> {
        self.liveness.set_not_live()
    }

    pub fn health_probe(&self) -> HealthStatus {
        self.liveness.probe()
    }
}
