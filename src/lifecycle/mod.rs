//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Regenerate active config → Start proxy → Set live marker
//!
//! Scheduler (scheduler.rs):
//!     Interval tick → lock → reload → release
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → shutdown.rs broadcast → scheduler + API server stop
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then proxy, then API listener
//! - The proxy process outlives the daemon; shutdown does not kill it

pub mod scheduler;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use scheduler::{CycleOutcome, ReloadScheduler};
pub use shutdown::Shutdown;
pub use startup::{bootstrap, BootstrapReport};
