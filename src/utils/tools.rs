//! Backup tool availability checks

use super::executor::CommandExecutor;
use crate::config::BackupType;
use crate::error::{BackupError, Result};
use tracing::debug;

/// Whether the tool behind `backup_type` is on the search path
pub fn check_available(executor: &dyn CommandExecutor, backup_type: BackupType) -> bool {
    match executor.find_program(backup_type.tool()) {
        Some(path) => {
            debug!("Found {} at {:?}", backup_type.tool(), path);
            true
        }
        None => false,
    }
}

/// Fail with install guidance when the tool is missing
pub fn ensure_available(executor: &dyn CommandExecutor, backup_type: BackupType) -> Result<()> {
    if check_available(executor, backup_type) {
        Ok(())
    } else {
        Err(BackupError::ToolUnavailable {
            tool: backup_type,
            instructions: install_instructions(backup_type).to_string(),
        })
    }
}

/// Static per-tool installation guidance
pub fn install_instructions(backup_type: BackupType) -> &'static str {
    match backup_type {
        BackupType::Rsync => {
            "rsync is not installed. Install it with:
  - Ubuntu/Debian: sudo apt install rsync
  - Fedora/RHEL: sudo dnf install rsync
  - macOS: brew install rsync (usually pre-installed)
  - Arch: sudo pacman -S rsync"
        }
        BackupType::Restic => {
            "restic is not installed. Install it with:
  - Ubuntu/Debian: sudo apt install restic
  - Fedora/RHEL: sudo dnf install restic
  - macOS: brew install restic
  - Arch: sudo pacman -S restic
  - Or download from: https://restic.net/"
        }
        BackupType::Rclone => {
            "rclone is not installed. Install it with:
  - Ubuntu/Debian: sudo apt install rclone
  - Fedora/RHEL: sudo dnf install rclone
  - macOS: brew install rclone
  - Arch: sudo pacman -S rclone
  - Or: curl https://rclone.org/install.sh | sudo bash"
        }
    }
}
