//! Liveness marker file.

use serde::Serialize;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{ConductorError, ConductorResult};

/// Result of a health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Ok,
    NotReady,
}

/// Presence of the marker file puts the node in rotation.
#[derive(Debug, Clone)]
pub struct LivenessMarker {
    path: PathBuf,
}

impl LivenessMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_live(&self) -> ConductorResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConductorError::io("failed to create liveness directory", parent, e))?;
        }
        File::create(&self.path).map_err(|e| ConductorError::io("failed to set live", &self.path, e))?;
        tracing::info!(marker = %self.path.display(), "Node marked live");
        Ok(())
    }

    pub fn set_not_live(&self) -> ConductorResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(ConductorError::io("failed to clear live", &self.path, e)),
        }
        tracing::info!(marker = %self.path.display(), "Node marked not live");
        Ok(())
    }

    pub fn is_live(&self) -> bool {
        self.path.is_file()
    }

    pub fn probe(&self) -> HealthStatus {
        if self.is_live() {
            HealthStatus::Ok
        } else {
            HealthStatus::NotReady
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_toggles() {
        let dir = tempfile::tempdir().unwrap();
        let marker = LivenessMarker::new(dir.path().join("state/live"));
        assert_eq!(marker.probe(), HealthStatus::NotReady);

        marker.set_live().unwrap();
        assert_eq!(marker.probe(), HealthStatus::Ok);
        marker.set_live().unwrap();

        marker.set_not_live().unwrap();
        assert_eq!(marker.probe(), HealthStatus::NotReady);
        marker.set_not_live().unwrap();
    }
}
