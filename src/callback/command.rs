//! External commands run as shutdown callbacks.

use crate::callback::Callback;
use crate::config::HookConfig;
use anyhow::{Context, anyhow, bail};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

enum Outcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    TimedOut,
    Cancelled,
}

/// A command spawned when shutdown runs.
///
/// The callback fails if the command cannot be started, exits with a
/// non-zero status, outlives its timeout, or is still running when the
/// shutdown token is cancelled. In the last two cases the child is killed.
#[derive(Debug, Clone)]
pub struct CommandHook {
    name: String,
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandHook {
    /// Hook running `program` with `args`.
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
            timeout: None,
        }
    }

    /// Build a hook from its configuration. Returns `None` for an empty
    /// command line.
    pub fn from_config(config: &HookConfig) -> Option<Self> {
        let (program, args) = config.command.split_first()?;
        let hook = Self::new(config.name.clone(), program.clone(), args.to_vec());
        Some(match config.timeout {
            Some(timeout) => hook.with_timeout(timeout),
            None => hook,
        })
    }

    /// Kill the command if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Hook name used in logs and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawn the command and wait for it.
    pub async fn run(&self, token: CancellationToken) -> anyhow::Result<()> {
        info!(hook = %self.name, program = %self.program, "running shutdown hook");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("hook '{}' failed to start '{}'", self.name, self.program))?;

        let limit = async {
            match self.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };

        let outcome = tokio::select! {
            status = child.wait() => Outcome::Exited(status),
            _ = limit => Outcome::TimedOut,
            _ = token.cancelled() => Outcome::Cancelled,
        };

        let status = match outcome {
            Outcome::Exited(status) => status
                .with_context(|| format!("hook '{}' failed to wait for its command", self.name))?,
            Outcome::TimedOut => {
                let _ = child.kill().await;
                return Err(anyhow!(
                    "hook '{}' timed out after {}",
                    self.name,
                    humantime::format_duration(self.timeout.unwrap_or_default())
                ));
            }
            Outcome::Cancelled => {
                let _ = child.kill().await;
                bail!("hook '{}' cancelled", self.name);
            }
        };

        if !status.success() {
            bail!("hook '{}' exited with {}", self.name, status);
        }

        debug!(hook = %self.name, "shutdown hook finished");
        Ok(())
    }

    /// Turn the hook into a shutdown callback.
    pub fn into_callback(self) -> Callback {
        let hook = Arc::new(self);
        Callback::new(move |token| {
            let hook = Arc::clone(&hook);
            async move { hook.run(token).await }
        })
    }
}

impl From<CommandHook> for Callback {
    fn from(hook: CommandHook) -> Self {
        hook.into_callback()
    }
}
