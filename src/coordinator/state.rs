//! Reload coordination state machine.
//!
//! # States
//! - UNLOCKED: change sets may be enqueued, routes may be mutated
//! - LOCKED: a reload cycle owns the proxy; mutations are refused
//!
//! # State Transitions
//! ```text
//! UNLOCKED → LOCKED:   lock_for_reload (pending queue non-empty)
//! LOCKED   → LOCKED:   reload (outcome recorded for the whole cycle)
//! LOCKED   → UNLOCKED: release
//! ```
//!
//! Independently of the lock, an `unloaded` marker records that the active
//! configuration was installed but a reload of it failed. Any successful
//! reload clears it.

use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::archive;
use crate::coordinator::registry::IdFile;
use crate::error::{ConductorError, ConductorResult};
use crate::model::{ChangeSetId, ChangeSetStatus};
use crate::observability::metrics;
use crate::proxy::ProxyControl;

pub const LOCK_FILE: &str = "lock";
pub const PENDING_FILE: &str = "pending";
pub const SUCCEEDED_FILE: &str = "succeeded";
pub const FAILED_FILE: &str = "failed";
pub const UNLOADED_FILE: &str = "unloaded";

/// Outcome supplied when releasing the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseOutcome {
    Success,
    Failure,
}

impl ReleaseOutcome {
    pub fn is_success(self) -> bool {
        self == ReleaseOutcome::Success
    }
}

impl From<bool> for ReleaseOutcome {
    fn from(success: bool) -> Self {
        if success {
            ReleaseOutcome::Success
        } else {
            ReleaseOutcome::Failure
        }
    }
}

/// Summary of one successful reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadReport {
    /// Change sets whose outcome was recorded by this reload.
    pub change_sets: Vec<ChangeSetId>,
}

/// File-backed lock, pending queue and outcome registries.
#[derive(Debug)]
pub struct ReloadCoordinator {
    lock_path: PathBuf,
    pending_file: IdFile,
    succeeded_file: IdFile,
    failed_file: IdFile,
    unloaded_path: PathBuf,
    locked: bool,
    unloaded: bool,
    pending: Vec<ChangeSetId>,
    succeeded: Vec<ChangeSetId>,
    failed: Vec<ChangeSetId>,
}

impl ReloadCoordinator {
    /// Load the persisted state from the proxy directory.
    pub fn open(dir: impl AsRef<Path>) -> ConductorResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ConductorError::io(
                "proxy directory unavailable",
                dir,
                std::io::Error::new(ErrorKind::NotFound, "not a directory"),
            ));
        }

        let pending_file = IdFile::new(dir.join(PENDING_FILE));
        let succeeded_file = IdFile::new(dir.join(SUCCEEDED_FILE));
        let failed_file = IdFile::new(dir.join(FAILED_FILE));
        let lock_path = dir.join(LOCK_FILE);
        let unloaded_path = dir.join(UNLOADED_FILE);

        let coordinator = Self {
            locked: lock_path.exists(),
            unloaded: unloaded_path.exists(),
            pending: pending_file.load()?,
            succeeded: succeeded_file.load()?,
            failed: failed_file.load()?,
            lock_path,
            pending_file,
            succeeded_file,
            failed_file,
            unloaded_path,
        };

        tracing::info!(
            locked = coordinator.locked,
            unloaded = coordinator.unloaded,
            pending = coordinator.pending.len(),
            succeeded = coordinator.succeeded.len(),
            failed = coordinator.failed.len(),
            "Reload coordinator state loaded"
        );
        metrics::record_pending(coordinator.pending.len());
        Ok(coordinator)
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn pending(&self) -> &[ChangeSetId] {
        &self.pending
    }

    /// Whether the active configuration still awaits a successful reload.
    pub fn reload_owed(&self) -> bool {
        self.unloaded
    }

    /// Record that a reload of the installed configuration failed.
    pub fn mark_reload_owed(&mut self) -> ConductorResult<()> {
        File::create(&self.unloaded_path).map_err(|e| {
            ConductorError::io("failed to mark config unloaded", &self.unloaded_path, e)
        })?;
        if !self.unloaded {
            tracing::warn!("Active config marked as not yet loaded by the proxy");
        }
        self.unloaded = true;
        Ok(())
    }

    /// Record that the proxy has loaded the active configuration.
    pub fn clear_reload_owed(&mut self) -> ConductorResult<()> {
        if !self.unloaded {
            return Ok(());
        }
        match fs::remove_file(&self.unloaded_path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ConductorError::io(
                    "failed to clear unloaded marker",
                    &self.unloaded_path,
                    e,
                ))
            }
        }
        self.unloaded = false;
        Ok(())
    }

    /// Enter the maintenance window.
    pub fn lock_for_reload(&mut self) -> ConductorResult<()> {
        if self.locked {
            return Err(ConductorError::Locked);
        }
        if self.pending.is_empty() {
            return Err(ConductorError::NothingPending);
        }

        // Memory follows disk only once the lock exists.
        let stamp = archive::timestamp();
        self.succeeded_file.archive(&stamp)?;
        self.failed_file.archive(&stamp)?;
        File::create(&self.lock_path)
            .map_err(|e| ConductorError::io("failed to create lock", &self.lock_path, e))?;

        self.succeeded.clear();
        self.failed.clear();
        self.locked = true;

        tracing::info!(pending = self.pending.len(), "Reload lock acquired");
        Ok(())
    }

    /// Queue a change set for the next reload. Returns `false` if it was
    /// already queued.
    pub fn enqueue(&mut self, id: &ChangeSetId) -> ConductorResult<bool> {
        if self.locked {
            return Err(ConductorError::Locked);
        }
        if self.pending.contains(id) {
            return Ok(false);
        }

        self.pending.push(id.clone());
        if let Err(e) = self.pending_file.store(&self.pending) {
            self.pending.pop();
            return Err(e);
        }

        tracing::info!(
            change_set = %id,
            pending = self.pending.len(),
            "Change set queued for reload"
        );
        metrics::record_pending(self.pending.len());
        Ok(true)
    }

    /// Record a change set whose mutation needed no reload.
    pub fn record_applied(&mut self, id: &ChangeSetId) -> ConductorResult<()> {
        if self.locked {
            return Err(ConductorError::Locked);
        }
        if self.succeeded.contains(id) {
            return Ok(());
        }
        self.failed.retain(|f| f != id);
        self.succeeded.push(id.clone());
        self.persist_registries()
    }

    /// Reload the proxy and record the outcome for every change set of the
    /// current cycle. Retries within the same cycle overwrite the outcome.
    pub async fn reload(&mut self, proxy: &dyn ProxyControl) -> ConductorResult<ReloadReport> {
        if !self.locked {
            return Err(ConductorError::NotLocked);
        }

        // Registries were rotated on lock, so they only hold this cycle.
        let mut cycle = self.pending.clone();
        for id in self.succeeded.iter().chain(self.failed.iter()) {
            if !cycle.contains(id) {
                cycle.push(id.clone());
            }
        }

        let result = proxy.reload().await;
        let success = result.is_ok();
        metrics::record_reload(success);
        self.settle(&cycle, success)?;

        match result {
            Ok(()) => {
                self.clear_reload_owed()?;
                tracing::info!(change_sets = cycle.len(), "Proxy reloaded");
                Ok(ReloadReport { change_sets: cycle })
            }
            Err(failure) => {
                tracing::error!(
                    change_sets = cycle.len(),
                    diagnostic = %failure,
                    "Proxy reload failed"
                );
                Err(ConductorError::Proxy {
                    action: "reload",
                    diagnostic: failure.diagnostic,
                })
            }
        }
    }

    /// Leave the maintenance window. Change sets still pending (no reload
    /// ran this cycle) take `outcome`.
    pub fn release(&mut self, outcome: ReleaseOutcome) -> ConductorResult<()> {
        if !self.locked {
            tracing::debug!("Release requested without a held lock");
            return Ok(());
        }

        if !self.pending.is_empty() {
            let cycle = self.pending.clone();
            self.settle(&cycle, outcome.is_success())?;
        }

        match fs::remove_file(&self.lock_path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(ConductorError::io("failed to remove lock", &self.lock_path, e)),
        }
        self.locked = false;

        tracing::info!(?outcome, "Reload lock released");
        Ok(())
    }

    pub fn query(&self, id: &ChangeSetId) -> ChangeSetStatus {
        if self.locked || self.pending.contains(id) {
            ChangeSetStatus::Pending
        } else if self.succeeded.contains(id) {
            ChangeSetStatus::Success
        } else if self.failed.contains(id) {
            ChangeSetStatus::Failed
        } else {
            ChangeSetStatus::NotFound
        }
    }

    fn settle(&mut self, cycle: &[ChangeSetId], success: bool) -> ConductorResult<()> {
        let (winners, losers) = if success {
            (&mut self.succeeded, &mut self.failed)
        } else {
            (&mut self.failed, &mut self.succeeded)
        };
        losers.retain(|id| !cycle.contains(id));
        for id in cycle {
            if !winners.contains(id) {
                winners.push(id.clone());
            }
        }
        self.pending.clear();

        metrics::record_pending(0);
        self.persist_registries()?;
        self.pending_file.store(&self.pending)
    }

    fn persist_registries(&self) -> ConductorResult<()> {
        self.succeeded_file.store(&self.succeeded)?;
        self.failed_file.store(&self.failed)
    }
}
