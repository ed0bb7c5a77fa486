//! Reload coordination.
//!
//! # Responsibilities
//! - Guard the maintenance window with a persistent lock marker
//! - Queue change sets that need a proxy reload
//! - Record the reload outcome of every change set in a cycle
//! - Answer change set status queries
//!
//! # Data Flow
//! ```text
//! enqueue ──▶ pending ──lock──▶ [locked] ──reload──▶ succeeded | failed
//!                                   │                      │
//!                                   └───────release────────┘
//! ```
//!
//! All state lives in marker files under the proxy directory so that a
//! restarted daemon resumes the cycle it was in.

pub mod registry;
pub mod state;

pub use registry::IdFile;
pub use state::{ReleaseOutcome, ReloadCoordinator, ReloadReport};
