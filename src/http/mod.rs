//! HTTP/JSON API.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request ID, trace, timeout layers)
//!     → auth.rs (bearer key on /v1, when configured)
//!     → handlers.rs (decode, call ConductorService, encode)
//!     → error.rs (ConductorError → status + JSON body)
//! ```
//!
//! # Design Decisions
//! - `/health` sits outside `/v1` and is never authenticated
//! - Handlers hold no state of their own

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{ApiServer, AppState};
