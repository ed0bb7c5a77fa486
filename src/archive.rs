//! Timestamped backups.
//!
//! Backups are named `{file}.BAK.{yyyymmddHHMMSS}`. When two backups of the
//! same file land in the same second a `.{n}` counter is appended, so an
//! existing backup is never overwritten.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{ConductorError, ConductorResult};

pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S").to_string()
}

/// First unused backup path for `path` at `stamp`.
pub fn backup_path(path: &Path, stamp: &str) -> PathBuf {
    let base = format!("{}.BAK.{}", path.display(), stamp);
    let mut candidate = PathBuf::from(&base);
    let mut n = 1;
    while candidate.exists() {
        candidate = PathBuf::from(format!("{}.{}", base, n));
        n += 1;
    }
    candidate
}

/// Rename `path` to a fresh backup. Returns `None` if there was nothing to
/// archive.
pub fn archive(path: &Path, stamp: &str) -> ConductorResult<Option<PathBuf>> {
    let target = backup_path(path, stamp);
    match fs::rename(path, &target) {
        Ok(()) => Ok(Some(target)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConductorError::io("failed to archive", path, e)),
    }
}
