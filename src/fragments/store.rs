//! Durable fragment storage with an in-memory key index.
//!
//! # Responsibilities
//! - Persist fragment bodies under the conf directory
//! - Keep the index of present keys in step with every write and delete
//! - Snapshot and restore the fragments of a set of owners for rollback
//!
//! # Design Decisions
//! - The index is the source of truth for assembly; the directory is only
//!   scanned on open and on explicit rescan
//! - Writes go through a temp file and a rename, so a fragment is never
//!   half-written
//! - Deleting an absent fragment is not an error

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{ConductorError, ConductorResult};
use crate::fragments::key::FragmentKey;

/// Fragment bodies captured before a mutation.
#[derive(Debug, Default, Clone)]
pub struct FragmentSnapshot {
    owners: Vec<String>,
    entries: Vec<(FragmentKey, Vec<u8>)>,
}

impl FragmentSnapshot {
    pub fn owners(&self) -> &[String] {
        &self.owners
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fragment directory plus its key index.
#[derive(Debug)]
pub struct FragmentStore {
    dir: PathBuf,
    index: BTreeSet<FragmentKey>,
}

impl FragmentStore {
    /// Open the store, indexing the fragments already on disk.
    ///
    /// A missing or unreadable directory is fatal.
    pub fn open(dir: impl AsRef<Path>) -> ConductorResult<Self> {
        let mut store = Self {
            dir: dir.as_ref().to_path_buf(),
            index: BTreeSet::new(),
        };
        store.rescan()?;
        Ok(store)
    }

    /// Rebuild the index from the directory contents.
    pub fn rescan(&mut self) -> ConductorResult<()> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| ConductorError::io("failed to read fragment directory", &self.dir, e))?;

        let mut index = BTreeSet::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| ConductorError::io("failed to read fragment directory", &self.dir, e))?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            match FragmentKey::parse(&name) {
                Some(key) => {
                    index.insert(key);
                }
                None => tracing::debug!(file = %name, "Ignoring file outside the fragment convention"),
            }
        }

        tracing::debug!(dir = %self.dir.display(), fragments = index.len(), "Fragment index rebuilt");
        self.index = index;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, key: &FragmentKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    pub fn contains(&self, key: &FragmentKey) -> bool {
        self.index.contains(key)
    }

    /// All indexed keys, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &FragmentKey> {
        self.index.iter()
    }

    /// Keys owned by one route or base owner.
    pub fn owned_by(&self, owner: &str) -> Vec<FragmentKey> {
        self.index
            .iter()
            .filter(|k| k.owner == owner)
            .cloned()
            .collect()
    }

    pub fn read(&self, key: &FragmentKey) -> ConductorResult<Vec<u8>> {
        let path = self.path(key);
        fs::read(&path).map_err(|e| ConductorError::io("failed to read fragment", path, e))
    }

    pub fn write(&mut self, key: &FragmentKey, body: &[u8]) -> ConductorResult<()> {
        let path = self.path(key);
        let tmp = self.dir.join(format!(".{}.tmp", key.file_name()));

        fs::write(&tmp, body).map_err(|e| ConductorError::io("failed to write fragment", &tmp, e))?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(ConductorError::io("failed to write fragment", path, e));
        }

        self.index.insert(key.clone());
        Ok(())
    }

    /// Delete one fragment. Absent fragments are ignored.
    pub fn remove(&mut self, key: &FragmentKey) -> ConductorResult<()> {
        let path = self.path(key);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(ConductorError::io("failed to delete fragment", path, e)),
        }
        self.index.remove(key);
        Ok(())
    }

    /// Delete every fragment owned by `owner`, across all kinds.
    pub fn remove_owner(&mut self, owner: &str) -> ConductorResult<Vec<FragmentKey>> {
        let keys = self.owned_by(owner);
        for key in &keys {
            self.remove(key)?;
        }
        if !keys.is_empty() {
            tracing::debug!(owner = %owner, removed = keys.len(), "Removed fragments");
        }
        Ok(keys)
    }

    /// Capture the fragments of the given owners.
    pub fn snapshot<'a, I>(&self, owners: I) -> ConductorResult<FragmentSnapshot>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut snapshot = FragmentSnapshot::default();
        for owner in owners {
            if snapshot.owners.iter().any(|o| o == owner) {
                continue;
            }
            snapshot.owners.push(owner.to_string());
            for key in self.owned_by(owner) {
                let body = self.read(&key)?;
                snapshot.entries.push((key, body));
            }
        }
        Ok(snapshot)
    }

    /// Put the snapshotted owners back exactly as captured.
    ///
    /// Every failing step is logged and the first error returned after all
    /// steps were attempted.
    pub fn restore(&mut self, snapshot: &FragmentSnapshot) -> ConductorResult<()> {
        let mut first_error = None;

        for owner in &snapshot.owners {
            if let Err(e) = self.remove_owner(owner) {
                tracing::error!(owner = %owner, error = %e, "Failed to clear fragments during restore");
                first_error.get_or_insert(e);
            }
        }
        for (key, body) in &snapshot.entries {
            if let Err(e) = self.write(key, body) {
                tracing::error!(fragment = %key, error = %e, "Failed to restore fragment");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
