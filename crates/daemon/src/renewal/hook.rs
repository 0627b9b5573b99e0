//! Post-cycle hook

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::error::HookError;

/// Run once after every cycle
#[async_trait]
pub trait PostCycleHook: Send + Sync {
    async fn run(&self) -> Result<(), HookError>;
}

/// Runs a command string through `sh -c`
#[derive(Debug, Clone)]
pub struct ShellHook {
    command: String,
}

impl ShellHook {
    /// Returns `None` for a blank command.
    pub fn new(command: impl Into<String>) -> Option<Self> {
        let command = command.into();
        if command.trim().is_empty() {
            None
        } else {
            Some(Self { command })
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl PostCycleHook for ShellHook {
    async fn run(&self) -> Result<(), HookError> {
        debug!(command = %self.command, "Running post-cycle hook");

        let status = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .status()
            .await
            .map_err(|source| HookError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if !status.success() {
            return Err(HookError::Failed {
                command: self.command.clone(),
                status: status.to_string(),
            });
        }

        info!(command = %self.command, "Post-cycle hook finished");
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_blank_command_is_none() {
        assert!(ShellHook::new("").is_none());
        assert!(ShellHook::new("   ").is_none());
        assert_eq!(ShellHook::new("nginx -s reload").unwrap().command(), "nginx -s reload");
    }

    #[tokio::test]
    async fn test_runs_through_shell() {
        let temp_dir = TempDir::new().unwrap();
        let marker = temp_dir.path().join("ran");
        let hook = ShellHook::new(format!("echo done > '{}'", marker.display())).unwrap();

        hook.run().await.unwrap();

        assert_eq!(std::fs::read_to_string(marker).unwrap().trim(), "done");
    }

    #[tokio::test]
    async fn test_failure_is_reported() {
        let hook = ShellHook::new("exit 3").unwrap();
        assert!(matches!(hook.run().await, Err(HookError::Failed { .. })));
    }
}
