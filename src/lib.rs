//! Reverse-proxy reload conductor library.

pub mod archive;
pub mod assembly;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fragments;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod model;
pub mod observability;
pub mod proxy;
pub mod service;

pub use config::schema::ConductorConfig;
pub use error::{ConductorError, ConductorResult};
pub use http::ApiServer;
pub use lifecycle::Shutdown;
pub use service::ConductorService;
