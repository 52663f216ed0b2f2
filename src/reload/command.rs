//! Reload through a shell command.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::schema::ReloadConfig;
use crate::reload::{ReloadError, ReloadTrigger};

/// Runs `sh -c <command>`, e.g. a `kill -s HUP` against the proxy's pid.
pub struct CommandReload {
    command: String,
    timeout: Duration,
}

impl CommandReload {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ReloadConfig) -> Self {
        Self::new(config.command.clone(), config.timeout())
    }
}

#[async_trait]
impl ReloadTrigger for CommandReload {
    async fn reload(&self) -> Result<(), ReloadError> {
        tracing::info!(command = %self.command, "Reloading proxy...");

        let child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ReloadError::Spawn)?;

        // Dropping the future on timeout drops the child, which kills it.
        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(ReloadError::Spawn)?,
            Err(_) => return Err(ReloadError::Timeout(self.timeout)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(ReloadError::Failed {
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        tracing::info!(stdout = %stdout.trim(), stderr = %stderr.trim(), "Proxy reloaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_command() {
        let reload = CommandReload::new("echo reloaded", Duration::from_secs(5));
        reload.reload().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_command() {
        let reload = CommandReload::new("echo 'no such process' >&2; exit 3", Duration::from_secs(5));
        match reload.reload().await.unwrap_err() {
            ReloadError::Failed { status, stderr } => {
                assert!(status.contains('3'));
                assert_eq!(stderr, "no such process");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let reload = CommandReload::new("sleep 5", Duration::from_millis(100));
        assert!(matches!(reload.reload().await, Err(ReloadError::Timeout(_))));
    }

    #[test]
    fn test_from_config() {
        let config = ReloadConfig {
            command: "true".into(),
            timeout_secs: 7,
        };
        let reload = CommandReload::from_config(&config);
        assert_eq!(reload.timeout, Duration::from_secs(7));
    }
}
