//! Fragment subsystem.
//!
//! # Data Flow
//! ```text
//! ServiceRoute (upsert)
//!     → render.rs (ACL / backend / default_backend bodies)
//!     → store.rs (write under conf dir, update key index)
//!
//! ServiceRoute (remove)
//!     → store.rs (delete every fragment owned by the route)
//!
//! Assembly
//!     → store.rs key index (what exists, in what order)
//!     → store.rs read (bodies)
//! ```
//!
//! # Design Decisions
//! - Stale fragments are always deleted before new ones are written
//! - Base fragments (globalcfg, defaultcfg, frontendcfg) are placed by
//!   operators and picked up on rescan

pub mod key;
pub mod render;
pub mod store;

pub use key::{FragmentKey, FragmentKind};
pub use store::{FragmentSnapshot, FragmentStore};
