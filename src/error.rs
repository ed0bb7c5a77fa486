//! Error taxonomy for the conductor core.
//!
//! # Design Decisions
//! - One enum shared by store, assembler, coordinator and service
//! - `Locked` and `NothingPending` are expected outcomes, not faults
//! - Unknown change sets are reported through `ChangeSetStatus::NotFound`,
//!   never through this type

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors surfaced by conductor operations.
#[derive(Debug, Error)]
pub enum ConductorError {
    /// A mutation or lock request hit an active maintenance window.
    #[error("LOCKED")]
    Locked,

    /// The assembled configuration was rejected by the proxy.
    #[error("validation failed: {diagnostic}")]
    ValidationFailed { diagnostic: String },

    /// A fragment, config or marker file operation failed.
    #[error("{context} ({}): {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `lock_for_reload` was called with an empty pending queue.
    #[error("no change sets pending reload")]
    NothingPending,

    /// A reload was requested outside of a lock cycle.
    #[error("reload requested without holding the reload lock")]
    NotLocked,

    /// A route in the batch is malformed.
    #[error("invalid route: {0}")]
    InvalidRoute(String),

    /// The change set id is missing or malformed.
    #[error("invalid change set: {0}")]
    InvalidChangeSet(String),

    /// An external proxy command failed.
    #[error("proxy {action} failed: {diagnostic}")]
    Proxy {
        action: &'static str,
        diagnostic: String,
    },

    /// The task running an operation ended without producing a result.
    #[error("operation aborted: {0}")]
    Aborted(String),
}

impl ConductorError {
    /// Build an `Io` error for the given path.
    pub fn io(context: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Short machine-readable kind, used in API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::Io { .. } => "io",
            Self::NothingPending => "nothing_pending",
            Self::NotLocked => "not_locked",
            Self::InvalidRoute(_) => "invalid_route",
            Self::InvalidChangeSet(_) => "invalid_change_set",
            Self::Proxy { .. } => "proxy",
            Self::Aborted(_) => "aborted",
        }
    }

    /// Whether the caller may simply retry later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Locked | Self::NothingPending)
    }
}

/// Result type for conductor operations.
pub type ConductorResult<T> = Result<T, ConductorError>;
