//! Config assembly subsystem.
//!
//! # Data Flow
//! ```text
//! FragmentStore (key index + bodies)
//!     → assembler.rs (fixed global order, concatenate)
//!     → compare with config.active
//!         identical → no change, nothing written
//!         different → config.active renamed to config.active.BAK.<ts>
//!                   → new content written in its place
//! ```
//!
//! # Design Decisions
//! - Output is a pure function of the fragment index and bodies
//! - The active file is never left missing or partial

pub mod assembler;

pub use assembler::{Assembler, Assembly, ACTIVE_CONFIG};
