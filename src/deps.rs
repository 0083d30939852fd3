//! Post-generation dependency resolution (e.g. `go mod tidy`)

use crate::{Result, SproutError};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, instrument};

#[async_trait]
pub trait DependencyResolver: Send + Sync {
    /// Resolve dependencies for the project rooted at `root`
    async fn resolve(&self, root: &Path) -> Result<()>;

    fn describe(&self) -> String;
}

/// Runs an external command in the project root and checks its exit status
#[derive(Debug, Clone)]
pub struct CommandResolver {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandResolver {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl DependencyResolver for CommandResolver {
    #[instrument(skip(self), fields(command = %self.describe()))]
    async fn resolve(&self, root: &Path) -> Result<()> {
        info!("Running {}...", self.describe());

        // Output goes straight to the user's terminal.
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(root)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let status = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.status())
                .await
                .map_err(|_| {
                    SproutError::DependencyResolution(format!(
                        "{} timed out after {}s",
                        self.describe(),
                        limit.as_secs()
                    ))
                })?,
            None => cmd.status().await,
        }
        .map_err(|e| {
            SproutError::DependencyResolution(format!("could not run {}: {}", self.program, e))
        })?;

        if !status.success() {
            return Err(SproutError::DependencyResolution(format!(
                "{} exited with {}",
                self.describe(),
                status
            )));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Resolver that does nothing, for `--no-deps`
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipResolver;

#[async_trait]
impl DependencyResolver for SkipResolver {
    async fn resolve(&self, _root: &Path) -> Result<()> {
        info!("Skipping dependency resolution");
        Ok(())
    }

    fn describe(&self) -> String {
        "skip".to_string()
    }
}
