//! Node liveness.
//!
//! # Data Flow
//! ```text
//! set_live / set_not_live
//!     → liveness.rs (create / delete marker file)
//!
//! HEAD /health
//!     → liveness.rs probe (marker present → Ok, absent → NotReady)
//! ```
//!
//! # Design Decisions
//! - The marker file is the only state, so an external load balancer or an
//!   operator can inspect it directly
//! - Liveness is independent of the reload lock

pub mod liveness;

pub use liveness::{HealthStatus, LivenessMarker};
