//! Backup manager - orchestrates one backup run
//!
//! Order of a run: tool check, lock (real runs only), pre-backup hook,
//! transfer, then either the post-backup hook (success) or the on-failure
//! hook (failure). Nothing is retried.

use crate::config::BackupConfig;
use crate::error::{BackupError, HookStage, Result};
use crate::strategies::strategy_for;
use crate::utils::command::CommandSpec;
use crate::utils::executor::CommandExecutor;
use crate::utils::locker::BackupLock;
use crate::utils::tools;
use chrono::{DateTime, Duration, Local};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Outcome of a run, including output captured before any failure
#[derive(Debug)]
pub struct RunResult {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub output: String,
    pub error: Option<BackupError>,
}

impl RunResult {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    pub fn elapsed(&self) -> Duration {
        self.finished_at - self.started_at
    }

    pub fn into_result(self) -> Result<String> {
        match self.error {
            None => Ok(self.output),
            Some(e) => Err(e),
        }
    }
}

pub struct BackupManager<'a> {
    executor: &'a dyn CommandExecutor,
    lock_dir: Option<PathBuf>,
}

impl<'a> BackupManager<'a> {
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self {
            executor,
            lock_dir: None,
        }
    }

    /// Take `<dir>/<name>.lock` for the duration of real runs
    pub fn with_lock_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lock_dir = Some(dir.into());
        self
    }

    /// Run a backup. Never panics; every failure ends up in [`RunResult::error`].
    pub fn run(&self, config: &BackupConfig, dry_run: bool) -> RunResult {
        let started_at = Local::now();
        info!(
            "Starting {}backup '{}' ({})",
            if dry_run { "dry-run " } else { "" },
            config.name,
            config.backup_type()
        );

        let mut output = String::new();
        let error = self.run_inner(config, dry_run, &mut output).err();

        match error {
            None => info!("Backup '{}' completed successfully", config.name),
            Some(ref e) => error!("Backup '{}' failed: {}", config.name, e),
        }

        RunResult {
            started_at,
            finished_at: Local::now(),
            output,
            error,
        }
    }

    fn run_inner(&self, config: &BackupConfig, dry_run: bool, output: &mut String) -> Result<()> {
        tools::ensure_available(self.executor, config.backup_type())?;

        let mut lock = match (&self.lock_dir, dry_run) {
            (Some(dir), false) => Some(BackupLock::open(dir, &config.name)?),
            _ => None,
        };
        let _guard = match lock.as_mut() {
            Some(lock) => Some(lock.try_hold()?),
            None => None,
        };

        if let Some(ref script) = config.hooks.pre_backup {
            self.run_hook(config, HookStage::PreBackup, script)?;
        }

        let strategy = strategy_for(config, self.executor);
        debug!("Using {} strategy", strategy.name());

        match strategy.run(dry_run) {
            Ok(transfer_output) => {
                *output = transfer_output;
            }
            Err(e) => {
                if let Some(captured) = e.captured_output() {
                    *output = captured.to_string();
                }
                if let Some(ref script) = config.hooks.on_failure {
                    if let Err(hook_err) = self.run_hook(config, HookStage::OnFailure, script) {
                        warn!("Ignoring on-failure hook error: {}", hook_err);
                    }
                }
                return Err(e);
            }
        }

        if let Some(ref script) = config.hooks.post_backup {
            self.run_hook(config, HookStage::PostBackup, script)?;
        }

        Ok(())
    }

    /// Execute a hook with `sh -c` and the backup's environment
    fn run_hook(&self, config: &BackupConfig, stage: HookStage, script: &str) -> Result<()> {
        info!("Running {} hook: {}", stage, script);

        let spec = CommandSpec::shell(script).envs(&config.env_pairs());
        let result = self.executor.run(&spec)?;

        if result.success() {
            info!("Hook completed successfully: {}", stage);
            Ok(())
        } else {
            error!("{} hook failed: {}", stage, result.status());
            Err(BackupError::Hook {
                stage,
                status: result.status(),
                output: result.combined(),
            })
        }
    }
}
