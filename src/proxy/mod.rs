//! Proxy process collaborator.
//!
//! # Responsibilities
//! - Start the proxy against a config file
//! - Validate an assembled config without applying it
//! - Trigger a reload of the running proxy
//! - Kill the running proxy
//!
//! # Design Decisions
//! - Exit status is the only success signal
//! - Failures carry the command output as a diagnostic
//! - The trait is the seam tests replace with a scripted fake

pub mod command;

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

pub use command::CommandProxy;

/// A proxy command that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{diagnostic}")]
pub struct CommandFailure {
    pub diagnostic: String,
}

impl CommandFailure {
    pub fn new(diagnostic: impl Into<String>) -> Self {
        Self {
            diagnostic: diagnostic.into(),
        }
    }
}

/// Operations the conductor needs from the proxy binary.
#[async_trait]
pub trait ProxyControl: Send + Sync + 'static {
    async fn start(&self, config: &Path) -> Result<(), CommandFailure>;

    async fn validate(&self, config: &Path) -> Result<(), CommandFailure>;

    async fn reload(&self) -> Result<(), CommandFailure>;

    async fn kill(&self) -> Result<(), CommandFailure>;
}
