//! Cleanup engine - applies retention to a backup destination

use crate::config::BackupConfig;
use crate::error::Result;
use crate::strategies::strategy_for;
use crate::utils::executor::CommandExecutor;
use crate::utils::locker::BackupLock;
use crate::utils::tools;
use std::path::Path;
use tracing::info;

/// Prune old snapshots/files according to the backup's retention.
///
/// Holds the backup's lock for the duration when `lock_dir` is given, so a
/// prune never overlaps a running transfer.
pub fn cleanup(
    executor: &dyn CommandExecutor,
    config: &BackupConfig,
    lock_dir: Option<&Path>,
) -> Result<()> {
    if !config.has_retention() {
        info!("Nothing to clean up for '{}'", config.name);
        return Ok(());
    }

    tools::ensure_available(executor, config.backup_type())?;

    let mut lock = match lock_dir {
        Some(dir) => Some(BackupLock::open(dir, &config.name)?),
        None => None,
    };
    let _guard = match lock.as_mut() {
        Some(lock) => Some(lock.try_hold()?),
        None => None,
    };

    info!("Running retention cleanup for '{}'", config.name);
    strategy_for(config, executor).cleanup(&config.effective_retention())
}
