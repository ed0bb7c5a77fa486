//! Newline-separated change set id files.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::archive;
use crate::error::{ConductorError, ConductorResult};
use crate::model::ChangeSetId;

/// One marker file holding an ordered set of change set ids.
#[derive(Debug, Clone)]
pub struct IdFile {
    path: PathBuf,
}

impl IdFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the ids; a missing file is an empty set. Blank and malformed
    /// lines are skipped, duplicates collapse to their first occurrence.
    pub fn load(&self) -> ConductorResult<Vec<ChangeSetId>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ConductorError::io("failed to read marker", &self.path, e)),
        };

        let mut ids: Vec<ChangeSetId> = Vec::new();
        for line in content.lines() {
            match ChangeSetId::new(line) {
                Ok(id) if !ids.contains(&id) => ids.push(id),
                Ok(_) => {}
                Err(_) if line.is_empty() => {}
                Err(_) => tracing::warn!(file = %self.path.display(), line = %line, "Skipping malformed change set id"),
            }
        }
        Ok(ids)
    }

    /// Persist the ids. An empty set removes the file.
    pub fn store(&self, ids: &[ChangeSetId]) -> ConductorResult<()> {
        if ids.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(ConductorError::io("failed to clear marker", &self.path, e)),
            };
        }

        let mut content = String::new();
        for id in ids {
            content.push_str(id.as_str());
            content.push('\n');
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content).map_err(|e| ConductorError::io("failed to write marker", &tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| ConductorError::io("failed to write marker", &self.path, e))
    }

    /// Move the file to a timestamped backup.
    pub fn archive(&self, stamp: &str) -> ConductorResult<Option<PathBuf>> {
        archive::archive(&self.path, stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ChangeSetId {
        ChangeSetId::new(s).unwrap()
    }

    #[test]
    fn test_store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = IdFile::new(dir.path().join("pending"));
        assert!(file.load().unwrap().is_empty());

        file.store(&[id("a"), id("b")]).unwrap();
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "a\nb\n");
        assert_eq!(file.load().unwrap(), vec![id("a"), id("b")]);

        file.store(&[]).unwrap();
        assert!(!file.path().exists());
    }

    #[test]
    fn test_load_tolerates_hand_edits() {
        let dir = tempfile::tempdir().unwrap();
        let file = IdFile::new(dir.path().join("succeeded"));
        fs::write(file.path(), "a\n\nb\na\n b\n").unwrap();
        assert_eq!(file.load().unwrap(), vec![id("a"), id("b")]);
    }
}
