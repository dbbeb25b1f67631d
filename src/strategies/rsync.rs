//! rsync strategy
//!
//! rsync mirrors sources into a plain directory (local or `host:path`). It
//! has no retention model, so cleanup does nothing.

use super::{exclude_args, run_checked, source_basename, BackupStrategy};
use crate::config::{BackupConfig, Retention, RsyncDestination, RsyncOptions, VerifyMethod};
use crate::error::{BackupError, Result};
use crate::managers::verify::{within_size_tolerance, VerifyResult};
use crate::utils::command::CommandSpec;
use crate::utils::executor::CommandExecutor;
use std::fmt::Write as _;
use tracing::{debug, info};

pub struct RsyncStrategy<'a> {
    config: &'a BackupConfig,
    destination: &'a RsyncDestination,
    options: &'a RsyncOptions,
    executor: &'a dyn CommandExecutor,
}

impl<'a> RsyncStrategy<'a> {
    pub fn new(
        config: &'a BackupConfig,
        destination: &'a RsyncDestination,
        options: &'a RsyncOptions,
        executor: &'a dyn CommandExecutor,
    ) -> Self {
        Self {
            config,
            destination,
            options,
            executor,
        }
    }

    /// Arguments for a transfer, in rsync's expected order
    pub fn run_args(&self, dry_run: bool) -> Vec<String> {
        let mut args = Vec::new();

        if dry_run {
            args.push("--dry-run".to_string());
        }
        if self.options.archive {
            args.push("-a".to_string());
        }
        if self.options.compress {
            args.push("-z".to_string());
        }
        if self.options.delete {
            args.push("--delete".to_string());
        }

        args.push("-v".to_string());
        args.push("--progress".to_string());
        args.extend(exclude_args(&self.options.exclude));
        args.extend(self.config.source.iter().cloned());
        args.push(self.destination.path.clone());
        args
    }

    fn is_remote(&self) -> bool {
        self.destination.path.contains(':')
    }

    /// Where rsync puts `source` inside the destination. A trailing slash
    /// copies the directory contents rather than the directory itself.
    fn dest_for(&self, source: &str) -> String {
        let dest = self.destination.path.trim_end_matches('/');
        if source.ends_with('/') {
            dest.to_string()
        } else {
            format!("{}/{}", dest, source_basename(source))
        }
    }

    /// Tree size in bytes via `du -sb`
    fn dir_size(&self, path: &str) -> std::result::Result<u64, String> {
        let spec = CommandSpec::new("du")
            .args(["-sb", path])
            .envs(&self.config.env_pairs());
        let output = self.executor.run(&spec).map_err(|e| e.to_string())?;
        if !output.success() {
            return Err(format!("du failed ({}): {}", output.status(), output.combined().trim()));
        }
        parse_du_size(&output.stdout)
    }

    fn verify_size(&self) -> VerifyResult {
        let mut details = String::new();
        let mut mismatches = Vec::new();

        for source in &self.config.source {
            let src_size = match self.dir_size(source) {
                Ok(size) => size,
                Err(e) => {
                    return VerifyResult::failed(format!("Failed to get source size: {}", e), details)
                }
            };

            if self.is_remote() {
                let _ = writeln!(
                    details,
                    "Source {}: {} bytes (remote verification not supported)",
                    source, src_size
                );
                continue;
            }

            let dest = self.dest_for(source);
            let dest_size = match self.dir_size(&dest) {
                Ok(size) => size,
                Err(e) => {
                    return VerifyResult::failed(
                        format!("Failed to get destination size: {}", e),
                        details,
                    )
                }
            };

            if within_size_tolerance(src_size, dest_size) {
                let _ = writeln!(details, "✓ {}: source={} bytes, dest={} bytes", source, src_size, dest_size);
            } else {
                let _ = writeln!(details, "✗ {}: source={} bytes, dest={} bytes", source, src_size, dest_size);
                mismatches.push(format!("{} (source={}, dest={})", source, src_size, dest_size));
            }
        }

        if mismatches.is_empty() {
            VerifyResult::passed("Verification successful", details)
        } else {
            VerifyResult::failed(format!("Size mismatch: {}", mismatches.join(", ")), details)
        }
    }

    fn verify_checksum(&self) -> Result<VerifyResult> {
        let spec = CommandSpec::new("rsync")
            .args(["--dry-run", "--checksum", "-n", "-i"])
            .args(self.config.source.iter().cloned())
            .arg(self.destination.path.clone())
            .envs(&self.config.env_pairs());

        let output = self.executor.run(&spec)?;
        let combined = output.combined();

        if !output.success() {
            return Ok(VerifyResult::failed(
                format!("Checksum verification failed ({})", output.status()),
                combined,
            ));
        }

        if combined.trim().is_empty() {
            Ok(VerifyResult::passed(
                "Checksum verification successful - all files match",
                String::new(),
            ))
        } else {
            Ok(VerifyResult::failed("Checksum verification found differences", combined))
        }
    }
}

/// First field of `du -sb` output (`123456\t/path`)
fn parse_du_size(stdout: &str) -> std::result::Result<u64, String> {
    let field = stdout
        .split_whitespace()
        .next()
        .ok_or_else(|| format!("unexpected du output: {}", stdout))?;
    field
        .parse::<u64>()
        .map_err(|e| format!("failed to parse size '{}': {}", field, e))
}

impl BackupStrategy for RsyncStrategy<'_> {
    fn run(&self, dry_run: bool) -> Result<String> {
        info!(
            "Starting rsync backup '{}' to '{}'",
            self.config.name, self.destination.path
        );

        let spec = CommandSpec::new("rsync")
            .args(self.run_args(dry_run))
            .envs(&self.config.env_pairs())
            .tee(true);

        let output = run_checked(self.executor, &spec, "rsync")?;
        Ok(output.combined())
    }

    fn verify(&self, method: VerifyMethod) -> Result<VerifyResult> {
        debug!("Verifying rsync backup '{}' with {}", self.config.name, method);
        match method {
            VerifyMethod::Size => Ok(self.verify_size()),
            VerifyMethod::Checksum => self.verify_checksum(),
            other => Err(BackupError::Validation(format!(
                "unsupported verification method for rsync: {}",
                other
            ))),
        }
    }

    fn cleanup(&self, _retention: &Retention) -> Result<()> {
        info!("rsync has no retention model, nothing to clean up for '{}'", self.config.name);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "rsync"
    }
}
