//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the daemon.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the conductor daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ConductorConfig {
    /// Fragment, proxy and liveness locations.
    pub paths: PathsConfig,

    /// API listener.
    pub listener: ListenerConfig,

    /// External proxy commands.
    pub proxy: ProxyCommandConfig,

    /// Built-in periodic reload cycle.
    pub reload_schedule: ReloadScheduleConfig,

    /// API access control.
    pub api: ApiConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Filesystem layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding fragments (`{owner}.{kind}`).
    pub conf_dir: PathBuf,

    /// Directory holding `config.active`, its backups and the reload markers.
    pub proxy_dir: PathBuf,

    /// File whose presence puts the node in rotation.
    pub live_marker: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            conf_dir: PathBuf::from("/usr/local/etc/haproxy/conf"),
            proxy_dir: PathBuf::from("/usr/local/etc/haproxy"),
            live_marker: PathBuf::from("/usr/local/etc/live"),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:34015").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:34015".to_string(),
        }
    }
}

/// Command lines used to drive the proxy binary.
///
/// `{config}` in any argument is replaced with the active config path.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyCommandConfig {
    pub start_command: Vec<String>,
    pub validate_command: Vec<String>,
    pub reload_command: Vec<String>,
    pub kill_command: Vec<String>,

    /// Kill is only attempted while this file exists.
    pub pid_file: PathBuf,
}

impl Default for ProxyCommandConfig {
    fn default() -> Self {
        let argv = |parts: &[&str]| -> Vec<String> { parts.iter().map(|s| s.to_string()).collect() };
        Self {
            start_command: argv(&["haproxy", "-p", "/var/run/haproxy.pid", "-f", "{config}"]),
            validate_command: argv(&["haproxy", "-c", "-f", "{config}"]),
            reload_command: argv(&["/usr/bin/reload.sh"]),
            kill_command: argv(&["/usr/bin/kill.sh"]),
            pid_file: PathBuf::from("/var/run/haproxy.pid"),
        }
    }
}

/// Periodic lock → reload → release cycle.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReloadScheduleConfig {
    /// Run the cycle inside the daemon instead of relying on an external cron.
    pub enabled: bool,

    /// Seconds between cycles.
    pub interval_secs: u64,
}

impl Default for ReloadScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 30,
        }
    }
}

/// API access control.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ApiConfig {
    /// When set, `/v1` requests need `Authorization: Bearer <api_key>`.
    pub api_key: Option<String>,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upper bound for one API request, including proxy commands.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
