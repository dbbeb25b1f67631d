//! Quadlet Backup Library
//!
//! Backup orchestration for Quadlet hosts: per-backup configuration, schedule
//! translation, and run/verify/cleanup/notify on top of rsync, restic and rclone.

pub mod config;
pub mod error;
pub mod managers;
pub mod strategies;
pub mod utils;

// Re-export commonly used types
pub use config::{BackupConfig, BackupType, ConfigStore, Engine, Settings};
pub use error::{BackupError, HookStage, Result};
pub use managers::backup::{BackupManager, RunResult};
pub use managers::cleanup::cleanup;
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use managers::notification::{Notifier, NotifyStatus};
pub use managers::verify::{verify, VerifyResult};
pub use utils::schedule::parse_schedule;
