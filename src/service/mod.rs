//! Service orchestration.
//!
//! # Responsibilities
//! - Run every mutation as render → assemble → validate → coordinate
//! - Roll back fragments and the active config when a step fails
//! - Expose the coordinator, proxy and liveness operations to callers
//!
//! # Data Flow
//! ```text
//! RouteBatch
//!     → gate (tokio Mutex) + lock check
//!     → snapshot owners → fragments::render::apply_route
//!     → Assembler::generate
//!     → ProxyControl::validate (only if changed)
//!     → ReloadCoordinator::enqueue | ProxyControl::reload
//! ```
//!
//! # Design Decisions
//! - One gate covers store, assembler and coordinator, so the lock check
//!   and the mutation are atomic with respect to the scheduler and to
//!   concurrent requests
//! - A rejected config is undone from the backup taken by the assembler,
//!   leaving the active file byte-identical

pub mod conductor;

pub use conductor::{
    ConductorService, MutationOutcome, RegenerateOutcome, ReloadDisposition, ServiceStatus,
};
