//! Active configuration assembly.
//!
//! # Responsibilities
//! - Concatenate fragments in the fixed global order
//! - Back up the previous active configuration before replacing it
//! - Detect byte-identical output and skip the replacement
//! - Restore the previous configuration on failure or on request

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::archive;
use crate::error::{ConductorError, ConductorResult};
use crate::fragments::{FragmentKey, FragmentKind, FragmentStore};
use crate::observability::metrics;

/// File name of the active configuration inside the proxy directory.
pub const ACTIVE_CONFIG: &str = "config.active";

/// Result of one `generate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    /// Whether the active configuration content changed.
    pub changed: bool,
    /// Backup of the previous active configuration, when one existed and
    /// the content changed.
    pub backup: Option<PathBuf>,
}

fn of_kind<'a>(
    store: &'a FragmentStore,
    kind: FragmentKind,
    frontend: Option<&'a str>,
) -> impl Iterator<Item = FragmentKey> + 'a {
    store
        .keys()
        .filter(move |k| k.kind == kind && k.frontend.as_deref() == frontend)
        .cloned()
}

/// Builds `config.active` from the fragment store.
#[derive(Debug, Clone)]
pub struct Assembler {
    active: PathBuf,
}

impl Assembler {
    pub fn new(proxy_dir: impl AsRef<Path>) -> Self {
        Self {
            active: proxy_dir.as_ref().join(ACTIVE_CONFIG),
        }
    }

    pub fn active_path(&self) -> &Path {
        &self.active
    }

    /// Keys in assembly order.
    ///
    /// ```text
    /// globalcfg*, defaultcfg*, frontendcfg* (unqualified)
    /// per frontend: frontendcfg*, frontendtop*, frontend*, frontendbottom*, default_backend*
    /// backend*
    /// ```
    pub fn order(store: &FragmentStore) -> Vec<FragmentKey> {
        let mut order = Vec::new();
        order.extend(of_kind(store, FragmentKind::GlobalCfg, None));
        order.extend(of_kind(store, FragmentKind::DefaultCfg, None));
        order.extend(of_kind(store, FragmentKind::FrontendCfg, None));

        let frontends: BTreeSet<&str> = store.keys().filter_map(|k| k.frontend.as_deref()).collect();
        for frontend in frontends {
            for kind in [
                FragmentKind::FrontendCfg,
                FragmentKind::FrontendTop,
                FragmentKind::Frontend,
                FragmentKind::FrontendBottom,
                FragmentKind::DefaultBackend,
            ] {
                order.extend(of_kind(store, kind, Some(frontend)));
            }
        }

        order.extend(of_kind(store, FragmentKind::Backend, None));
        order
    }

    /// Render the full configuration without touching the active file.
    pub fn render(&self, store: &FragmentStore) -> ConductorResult<Vec<u8>> {
        if !store.dir().is_dir() {
            return Err(ConductorError::io(
                "fragment directory unavailable",
                store.dir(),
                std::io::Error::new(ErrorKind::NotFound, "not a directory"),
            ));
        }

        let mut out = Vec::new();
        for key in Self::order(store) {
            out.extend_from_slice(&store.read(&key)?);
        }
        Ok(out)
    }

    /// Assemble and install the active configuration.
    ///
    /// Identical output leaves the active file untouched and reports
    /// `changed = false`. Any failure after the backup was taken moves the
    /// backup back into place before returning.
    pub fn generate(&self, store: &FragmentStore) -> ConductorResult<Assembly> {
        let content = self.render(store)?;

        let previous = match fs::read(&self.active) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                return Err(ConductorError::io("failed to read active config", &self.active, e))
            }
        };

        if previous.as_deref() == Some(content.as_slice()) {
            tracing::debug!(path = %self.active.display(), "Assembled config unchanged");
            metrics::record_assembly(false);
            return Ok(Assembly {
                changed: false,
                backup: None,
            });
        }

        let backup = archive::archive(&self.active, &archive::timestamp())?;

        if let Err(e) = self.install(&content) {
            let assembly = Assembly {
                changed: true,
                backup,
            };
            if let Err(restore_err) = self.restore(&assembly) {
                tracing::error!(
                    error = %restore_err,
                    "Failed to restore active config after write failure"
                );
            }
            return Err(e);
        }

        tracing::info!(
            path = %self.active.display(),
            bytes = content.len(),
            backup = ?backup,
            "Active config assembled"
        );
        metrics::record_assembly(true);
        Ok(Assembly {
            changed: true,
            backup,
        })
    }

    fn install(&self, content: &[u8]) -> ConductorResult<()> {
        let tmp = self.active.with_extension("active.tmp");
        fs::write(&tmp, content)
            .map_err(|e| ConductorError::io("failed to write active config", &tmp, e))?;
        fs::rename(&tmp, &self.active).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            ConductorError::io("failed to write active config", &self.active, e)
        })
    }

    /// Undo a completed `generate`: the previous active configuration is
    /// moved back, or the file removed if there was none.
    pub fn restore(&self, assembly: &Assembly) -> ConductorResult<()> {
        if !assembly.changed {
            return Ok(());
        }
        match &assembly.backup {
            Some(backup) => fs::rename(backup, &self.active)
                .map_err(|e| ConductorError::io("failed to restore active config", backup, e))?,
            None => match fs::remove_file(&self.active) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(ConductorError::io(
                        "failed to restore active config",
                        &self.active,
                        e,
                    ))
                }
            },
        }
        tracing::warn!(path = %self.active.display(), "Active config restored to previous version");
        Ok(())
    }
}
