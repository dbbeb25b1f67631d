//! rclone strategy
//!
//! A single source syncs straight into the remote. With several sources each
//! one gets its own `<remote>/<basename>` subdirectory and its own rclone
//! invocation.

use super::{exclude_args, run_checked, source_basename, BackupStrategy};
use crate::config::{BackupConfig, RcloneDestination, RcloneOptions, Retention, VerifyMethod};
use crate::error::{BackupError, Result};
use crate::managers::verify::VerifyResult;
use crate::utils::command::{CommandOutput, CommandSpec};
use crate::utils::executor::CommandExecutor;
use serde::Deserialize;
use std::fmt::Write as _;
use tracing::{info, warn};

pub struct RcloneStrategy<'a> {
    config: &'a BackupConfig,
    destination: &'a RcloneDestination,
    options: &'a RcloneOptions,
    executor: &'a dyn CommandExecutor,
}

/// Output of `rclone size --json`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RcloneSize {
    pub count: u64,
    pub bytes: u64,
}

impl<'a> RcloneStrategy<'a> {
    pub fn new(
        config: &'a BackupConfig,
        destination: &'a RcloneDestination,
        options: &'a RcloneOptions,
        executor: &'a dyn CommandExecutor,
    ) -> Self {
        Self {
            config,
            destination,
            options,
            executor,
        }
    }

    /// `sync` flags shared by every source
    pub fn sync_args(&self, dry_run: bool) -> Vec<String> {
        let mut args = vec!["sync".to_string()];

        if dry_run {
            args.push("--dry-run".to_string());
        }
        if self.options.transfers > 0 {
            args.push("--transfers".to_string());
            args.push(self.options.transfers.to_string());
        }
        if self.options.checkers > 0 {
            args.push("--checkers".to_string());
            args.push(self.options.checkers.to_string());
        }
        if !self.options.bandwidth_limit.is_empty() {
            args.push("--bwlimit".to_string());
            args.push(self.options.bandwidth_limit.clone());
        }

        args.extend(exclude_args(&self.options.exclude));
        args.push("-v".to_string());
        args.push("--progress".to_string());
        args
    }

    /// Remote path a source is copied to
    pub fn target_for(&self, source: &str) -> String {
        let remote = &self.destination.remote;
        if self.config.source.len() <= 1 {
            return remote.clone();
        }

        let base = source_basename(source);
        if remote.ends_with(':') || remote.ends_with('/') {
            format!("{}{}", remote, base)
        } else {
            format!("{}/{}", remote, base)
        }
    }

    fn rclone(&self) -> CommandSpec {
        CommandSpec::new("rclone").envs(&self.config.env_pairs())
    }

    fn size_of(&self, path: &str) -> std::result::Result<RcloneSize, String> {
        let spec = self.rclone().args(["size", path, "--json"]);
        let output: CommandOutput = self.executor.run(&spec).map_err(|e| e.to_string())?;
        if !output.success() {
            return Err(format!("{}: {}", output.status(), output.combined().trim()));
        }
        serde_json::from_str(output.stdout.trim())
            .map_err(|e| format!("cannot parse rclone size output: {}", e))
    }

    /// `rclone check` / `rclone cryptcheck` for every source, never stopping early
    fn verify_compare(&self, method: VerifyMethod) -> Result<VerifyResult> {
        let mut details = String::new();
        let mut success = true;

        for source in &self.config.source {
            let target = self.target_for(source);
            let spec = self.rclone().args([method.to_string(), source.clone(), target]);
            let output = match self.executor.run(&spec) {
                Ok(output) => output,
                Err(e) => {
                    warn!("rclone {} could not run for {}: {}", method, source, e);
                    let _ = writeln!(details, "✗ {}: {}", source, e);
                    success = false;
                    continue;
                }
            };

            details.push_str(&output.combined());
            details.push('\n');

            if !output.success() {
                warn!("rclone {} reported differences for {}", method, source);
                success = false;
            }
        }

        if success {
            Ok(VerifyResult::passed(
                format!("Rclone {} successful - all files match", method),
                details,
            ))
        } else {
            Ok(VerifyResult::failed(
                format!("Rclone {} found differences", method),
                details,
            ))
        }
    }

    fn verify_size(&self) -> VerifyResult {
        let mut details = String::new();
        let mut problems = Vec::new();

        for source in &self.config.source {
            let target = self.target_for(source);

            let sizes = self
                .size_of(source)
                .map_err(|e| format!("failed to get source size: {}", e))
                .and_then(|src| {
                    self.size_of(&target)
                        .map(|dst| (src, dst))
                        .map_err(|e| format!("failed to get destination size: {}", e))
                });

            match sizes {
                Ok((src, dst)) if src == dst => {
                    let _ = writeln!(details, "✓ {}: {} objects, {} bytes", source, src.count, src.bytes);
                }
                Ok((src, dst)) => {
                    let _ = writeln!(
                        details,
                        "✗ {}: source={} objects/{} bytes, dest={} objects/{} bytes",
                        source, src.count, src.bytes, dst.count, dst.bytes
                    );
                    problems.push(source.clone());
                }
                Err(e) => {
                    let _ = writeln!(details, "✗ {}: {}", source, e);
                    problems.push(source.clone());
                }
            }
        }

        if problems.is_empty() {
            VerifyResult::passed("Size comparison successful", details)
        } else {
            VerifyResult::failed(
                format!("Size comparison found differences: {}", problems.join(", ")),
                details,
            )
        }
    }
}

impl BackupStrategy for RcloneStrategy<'_> {
    fn run(&self, dry_run: bool) -> Result<String> {
        info!(
            "Starting rclone backup '{}' to '{}'",
            self.config.name, self.destination.remote
        );

        let base_args = self.sync_args(dry_run);

        if self.config.source.len() == 1 {
            let source = &self.config.source[0];
            let spec = self
                .rclone()
                .args(base_args)
                .args([source.clone(), self.destination.remote.clone()])
                .tee(true);
            let output = run_checked(self.executor, &spec, "rclone sync")?;
            return Ok(output.combined());
        }

        let mut all_output = String::new();
        for source in &self.config.source {
            let spec = self
                .rclone()
                .args(base_args.iter().cloned())
                .args([source.clone(), self.target_for(source)]);

            let output = self.executor.run(&spec)?;
            all_output.push_str(&output.combined());
            all_output.push('\n');

            if !output.success() {
                // Earlier sources stay synced; the rest are not attempted
                return Err(BackupError::Transfer {
                    context: format!("rclone sync of {}", source),
                    status: output.status(),
                    output: all_output,
                });
            }
        }

        Ok(all_output)
    }

    fn verify(&self, method: VerifyMethod) -> Result<VerifyResult> {
        match method {
            VerifyMethod::Check | VerifyMethod::Cryptcheck => self.verify_compare(method),
            VerifyMethod::Size => Ok(self.verify_size()),
            other => Err(BackupError::Validation(format!(
                "unsupported verification method for rclone: {}",
                other
            ))),
        }
    }

    fn cleanup(&self, retention: &Retention) -> Result<()> {
        if retention.keep_days == 0 {
            info!("No retention configured for '{}'", self.config.name);
            return Ok(());
        }

        info!(
            "Deleting files older than {} days from {}",
            retention.keep_days, self.destination.remote
        );
        let spec = self.rclone().args([
            "delete".to_string(),
            self.destination.remote.clone(),
            "--min-age".to_string(),
            format!("{}d", retention.keep_days),
        ]);
        run_checked(self.executor, &spec, "rclone delete")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "rclone"
    }
}
