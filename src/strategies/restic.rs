//! restic strategy
//!
//! The repository and password file are handed to restic through
//! `RESTIC_REPOSITORY` / `RESTIC_PASSWORD_FILE` rather than flags.

use super::{exclude_args, run_checked, BackupStrategy};
use crate::config::{expand_tilde, BackupConfig, ResticDestination, ResticOptions, Retention, VerifyMethod};
use crate::error::{BackupError, Result};
use crate::managers::verify::VerifyResult;
use crate::utils::command::CommandSpec;
use crate::utils::executor::CommandExecutor;
use tracing::info;

pub struct ResticStrategy<'a> {
    config: &'a BackupConfig,
    destination: &'a ResticDestination,
    options: &'a ResticOptions,
    executor: &'a dyn CommandExecutor,
}

impl<'a> ResticStrategy<'a> {
    pub fn new(
        config: &'a BackupConfig,
        destination: &'a ResticDestination,
        options: &'a ResticOptions,
        executor: &'a dyn CommandExecutor,
    ) -> Self {
        Self {
            config,
            destination,
            options,
            executor,
        }
    }

    /// Configured environment plus the restic repository variables
    pub fn env(&self) -> Vec<(String, String)> {
        let mut env = self.config.env_pairs();
        if let Some(ref file) = self.options.password_file {
            env.push((
                "RESTIC_PASSWORD_FILE".to_string(),
                expand_tilde(file).display().to_string(),
            ));
        }
        env.push((
            "RESTIC_REPOSITORY".to_string(),
            self.destination.repository.clone(),
        ));
        env
    }

    fn restic(&self) -> CommandSpec {
        CommandSpec::new("restic").envs(&self.env())
    }

    /// `forget --prune` arguments, or `None` when no retention is set
    pub fn forget_args(retention: &Retention) -> Option<Vec<String>> {
        if retention.keep_daily == 0 && retention.keep_weekly == 0 && retention.keep_monthly == 0 {
            return None;
        }

        let mut args = vec!["forget".to_string(), "--prune".to_string()];
        for (flag, count) in [
            ("--keep-daily", retention.keep_daily),
            ("--keep-weekly", retention.keep_weekly),
            ("--keep-monthly", retention.keep_monthly),
        ] {
            if count > 0 {
                args.push(flag.to_string());
                args.push(count.to_string());
            }
        }
        Some(args)
    }
}

impl BackupStrategy for ResticStrategy<'_> {
    fn run(&self, dry_run: bool) -> Result<String> {
        if dry_run {
            // restic has no real dry run; check the repository is reachable
            info!("Dry run: listing latest snapshot of {}", self.destination.repository);
            let spec = self.restic().args(["snapshots", "--latest", "1"]);
            let output = run_checked(self.executor, &spec, "restic snapshots")?;
            return Ok(output.combined());
        }

        info!(
            "Starting restic backup '{}' to '{}'",
            self.config.name, self.destination.repository
        );

        let spec = self
            .restic()
            .arg("backup")
            .args(exclude_args(&self.options.exclude))
            .args(self.config.source.iter().cloned())
            .tee(true);

        let output = run_checked(self.executor, &spec, "restic backup")?;
        Ok(output.combined())
    }

    fn verify(&self, method: VerifyMethod) -> Result<VerifyResult> {
        if method != VerifyMethod::Check {
            return Err(BackupError::Validation(format!(
                "unsupported verification method for restic: {}",
                method
            )));
        }

        let output = self.executor.run(&self.restic().arg("check"))?;
        if output.success() {
            Ok(VerifyResult::passed(
                "Restic repository verification successful",
                output.combined(),
            ))
        } else {
            Ok(VerifyResult::failed(
                format!("Restic check failed ({})", output.status()),
                output.combined(),
            ))
        }
    }

    fn cleanup(&self, retention: &Retention) -> Result<()> {
        let Some(args) = Self::forget_args(retention) else {
            info!("No retention configured for '{}'", self.config.name);
            return Ok(());
        };

        info!("Applying retention to {}", self.destination.repository);
        run_checked(self.executor, &self.restic().args(args), "restic forget")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "restic"
    }
}
