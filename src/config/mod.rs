//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, or defaults)
//!     → CONF_PATH / HAPROXY_PATH environment overrides
//!     → validation.rs (semantic checks)
//!     → ConductorConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ApiConfig, ConductorConfig, ListenerConfig, ObservabilityConfig, PathsConfig, ProxyCommandConfig,
    ReloadScheduleConfig, TimeoutConfig,
};
