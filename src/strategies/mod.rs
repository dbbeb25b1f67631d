//! Per-tool backup strategies
//!
//! Each strategy knows how to turn a [`BackupConfig`] into invocations of its
//! tool for the three lifecycle operations: run, verify and cleanup. All
//! subprocesses go through a [`CommandExecutor`].

pub mod rclone;
pub mod restic;
pub mod rsync;

use crate::config::{BackupConfig, Engine, Retention, VerifyMethod};
use crate::error::{BackupError, Result};
use crate::managers::verify::VerifyResult;
use crate::utils::command::{CommandOutput, CommandSpec};
use crate::utils::executor::CommandExecutor;
use std::path::Path;

/// Trait for backup strategies
pub trait BackupStrategy {
    /// Transfer data. Returns the captured tool output.
    fn run(&self, dry_run: bool) -> Result<String>;

    /// Compare source and destination with `method`
    fn verify(&self, method: VerifyMethod) -> Result<VerifyResult>;

    /// Apply retention; a no-op when nothing is configured
    fn cleanup(&self, retention: &Retention) -> Result<()>;

    /// Get strategy name (for logging)
    fn name(&self) -> &'static str;
}

/// Pick the strategy matching the configuration's engine
pub fn strategy_for<'a>(
    config: &'a BackupConfig,
    executor: &'a dyn CommandExecutor,
) -> Box<dyn BackupStrategy + 'a> {
    match &config.engine {
        Engine::Rsync { destination, options } => {
            Box::new(rsync::RsyncStrategy::new(config, destination, options, executor))
        }
        Engine::Restic { destination, options } => {
            Box::new(restic::ResticStrategy::new(config, destination, options, executor))
        }
        Engine::Rclone { destination, options } => {
            Box::new(rclone::RcloneStrategy::new(config, destination, options, executor))
        }
    }
}

/// Run `spec` and turn a non-zero exit into [`BackupError::Transfer`]
pub(crate) fn run_checked(
    executor: &dyn CommandExecutor,
    spec: &CommandSpec,
    context: impl Into<String>,
) -> Result<CommandOutput> {
    let output = executor.run(spec)?;
    if output.success() {
        Ok(output)
    } else {
        Err(BackupError::Transfer {
            context: context.into(),
            status: output.status(),
            output: output.combined(),
        })
    }
}

/// `--exclude <pattern>` pairs
pub(crate) fn exclude_args(excludes: &[String]) -> Vec<String> {
    excludes
        .iter()
        .flat_map(|pattern| ["--exclude".to_string(), pattern.clone()])
        .collect()
}

/// Last path component of a source, ignoring trailing slashes
pub(crate) fn source_basename(source: &str) -> String {
    let trimmed = source.trim_end_matches('/');
    Path::new(trimmed)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| trimmed.to_string())
}
