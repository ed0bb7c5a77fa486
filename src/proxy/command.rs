//! `ProxyControl` backed by external command lines.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::config::ProxyCommandConfig;
use crate::proxy::{CommandFailure, ProxyControl};

const CONFIG_PLACEHOLDER: &str = "{config}";

/// Runs the configured start/validate/reload/kill commands.
#[derive(Debug, Clone)]
pub struct CommandProxy {
    config: ProxyCommandConfig,
}

impl CommandProxy {
    pub fn new(config: ProxyCommandConfig) -> Self {
        Self { config }
    }

    fn expand(argv: &[String], config_path: Option<&Path>) -> Vec<String> {
        argv.iter()
            .map(|arg| match config_path {
                Some(path) => arg.replace(CONFIG_PLACEHOLDER, &path.to_string_lossy()),
                None => arg.clone(),
            })
            .collect()
    }

    async fn run(action: &'static str, argv: Vec<String>) -> Result<(), CommandFailure> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| CommandFailure::new(format!("no {} command configured", action)))?;

        tracing::debug!(action, program = %program, args = ?args, "Running proxy command");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| CommandFailure::new(format!("failed to spawn {}: {}", program, e)))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let diagnostic = match (stderr.trim(), stdout.trim()) {
            ("", "") => format!("{} exited with {}", program, output.status),
            ("", out) => out.to_string(),
            (err, _) => err.to_string(),
        };
        tracing::warn!(action, status = %output.status, diagnostic = %diagnostic, "Proxy command failed");
        Err(CommandFailure::new(diagnostic))
    }
}

#[async_trait]
impl ProxyControl for CommandProxy {
    async fn start(&self, config: &Path) -> Result<(), CommandFailure> {
        Self::run("start", Self::expand(&self.config.start_command, Some(config))).await
    }

    async fn validate(&self, config: &Path) -> Result<(), CommandFailure> {
        Self::run("validate", Self::expand(&self.config.validate_command, Some(config))).await
    }

    async fn reload(&self) -> Result<(), CommandFailure> {
        Self::run("reload", Self::expand(&self.config.reload_command, None)).await
    }

    async fn kill(&self) -> Result<(), CommandFailure> {
        if !self.config.pid_file.exists() {
            tracing::debug!(pid_file = %self.config.pid_file.display(), "No pid file, nothing to kill");
            return Ok(());
        }
        Self::run("kill", Self::expand(&self.config.kill_command, None)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    fn proxy(validate: Vec<String>) -> CommandProxy {
        CommandProxy::new(ProxyCommandConfig {
            start_command: sh("true"),
            validate_command: validate,
            reload_command: sh("echo 'reload refused' >&2; exit 3"),
            kill_command: sh("exit 1"),
            pid_file: PathBuf::from("/nonexistent/conductor-test.pid"),
        })
    }

    #[test]
    fn test_placeholder_expansion() {
        let argv = vec!["haproxy".to_string(), "-f".into(), "{config}".into()];
        let expanded = CommandProxy::expand(&argv, Some(Path::new("/etc/haproxy/config.active")));
        assert_eq!(expanded[2], "/etc/haproxy/config.active");
    }

    #[tokio::test]
    async fn test_validate_receives_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.active");
        std::fs::write(&config, "global\n").unwrap();

        let proxy = proxy(sh("test -f {config}"));
        assert!(proxy.validate(&config).await.is_ok());
        assert!(proxy.validate(&dir.path().join("missing")).await.is_err());
    }

    #[tokio::test]
    async fn test_failure_carries_stderr() {
        let proxy = proxy(sh("true"));
        let err = proxy.reload().await.unwrap_err();
        assert_eq!(err.diagnostic, "reload refused");
    }

    #[tokio::test]
    async fn test_kill_without_pid_file_is_noop() {
        let proxy = proxy(sh("true"));
        assert!(proxy.kill().await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_command() {
        let proxy = proxy(Vec::new());
        let err = proxy.validate(Path::new("/tmp/x")).await.unwrap_err();
        assert!(err.diagnostic.contains("no validate command"));
    }
}
