use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Backup tool driving a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupType {
    Rsync,
    Restic,
    Rclone,
}

impl BackupType {
    pub const ALL: [BackupType; 3] = [BackupType::Rsync, BackupType::Restic, BackupType::Rclone];

    /// Name of the binary looked up on PATH
    pub fn tool(&self) -> &'static str {
        match self {
            BackupType::Rsync => "rsync",
            BackupType::Restic => "restic",
            BackupType::Rclone => "rclone",
        }
    }
}

impl std::fmt::Display for BackupType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tool())
    }
}

impl std::str::FromStr for BackupType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rsync" => Ok(BackupType::Rsync),
            "restic" => Ok(BackupType::Restic),
            "rclone" => Ok(BackupType::Rclone),
            other => Err(format!(
                "invalid backup type: {} (must be rsync, restic, or rclone)",
                other
            )),
        }
    }
}

/// A named backup job, stored as `<name>.yaml`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BackupConfig {
    #[serde(default)]
    pub name: String,

    /// Tool-specific destination and options, tagged by `type`
    #[serde(flatten)]
    pub engine: Engine,

    /// Human-friendly cadence ("daily 02:00") or a systemd calendar expression
    #[serde(default)]
    pub schedule: String,

    #[serde(default)]
    pub source: Vec<String>,

    #[serde(default, skip_serializing_if = "is_default")]
    pub verification: Verification,

    #[serde(default, skip_serializing_if = "is_default")]
    pub retention: Retention,

    #[serde(default, skip_serializing_if = "is_default")]
    pub notifications: Notifications,

    #[serde(default, skip_serializing_if = "is_default")]
    pub hooks: Hooks,

    /// `KEY=VALUE` entries added to every subprocess environment
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<String>,
}

/// Tool selection. Each variant only carries the fields its tool understands.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Engine {
    Rsync {
        #[serde(default)]
        destination: RsyncDestination,
        #[serde(default, skip_serializing_if = "is_default")]
        options: RsyncOptions,
    },
    Restic {
        #[serde(default)]
        destination: ResticDestination,
        #[serde(default, skip_serializing_if = "is_default")]
        options: ResticOptions,
    },
    Rclone {
        #[serde(default)]
        destination: RcloneDestination,
        #[serde(default, skip_serializing_if = "is_default")]
        options: RcloneOptions,
    },
}

impl Engine {
    pub fn rsync(path: impl Into<String>) -> Self {
        Engine::Rsync {
            destination: RsyncDestination { path: path.into() },
            options: RsyncOptions::default(),
        }
    }

    pub fn restic(repository: impl Into<String>) -> Self {
        Engine::Restic {
            destination: ResticDestination {
                repository: repository.into(),
            },
            options: ResticOptions::default(),
        }
    }

    pub fn rclone(remote: impl Into<String>) -> Self {
        Engine::Rclone {
            destination: RcloneDestination {
                remote: remote.into(),
            },
            options: RcloneOptions::default(),
        }
    }

    pub fn backup_type(&self) -> BackupType {
        match self {
            Engine::Rsync { .. } => BackupType::Rsync,
            Engine::Restic { .. } => BackupType::Restic,
            Engine::Rclone { .. } => BackupType::Rclone,
        }
    }

    /// Destination string meaningful to the engine's tool
    pub fn destination(&self) -> &str {
        match self {
            Engine::Rsync { destination, .. } => &destination.path,
            Engine::Restic { destination, .. } => &destination.repository,
            Engine::Rclone { destination, .. } => &destination.remote,
        }
    }

    pub fn excludes(&self) -> &[String] {
        match self {
            Engine::Rsync { options, .. } => &options.exclude,
            Engine::Restic { options, .. } => &options.exclude,
            Engine::Rclone { options, .. } => &options.exclude,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RsyncDestination {
    /// Local path or `user@host:/path`
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ResticDestination {
    #[serde(default)]
    pub repository: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RcloneDestination {
    /// rclone remote such as `gdrive:backups`
    #[serde(default)]
    pub remote: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RsyncOptions {
    #[serde(default, skip_serializing_if = "is_false")]
    pub archive: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub compress: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub delete: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ResticOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    /// Legacy location of the daily retention count; `retention.keep_daily` wins
    #[serde(default, skip_serializing_if = "is_zero")]
    pub keep_daily: u32,
    /// Legacy location of the weekly retention count; `retention.keep_weekly` wins
    #[serde(default, skip_serializing_if = "is_zero")]
    pub keep_weekly: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RcloneOptions {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub transfers: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub checkers: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bandwidth_limit: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMethod {
    Size,
    Checksum,
    Check,
    Cryptcheck,
}

impl VerifyMethod {
    /// Methods an engine knows how to run, default first
    pub fn supported_by(backup_type: BackupType) -> &'static [VerifyMethod] {
        match backup_type {
            BackupType::Rsync => &[VerifyMethod::Size, VerifyMethod::Checksum],
            BackupType::Restic => &[VerifyMethod::Check],
            BackupType::Rclone => &[
                VerifyMethod::Check,
                VerifyMethod::Cryptcheck,
                VerifyMethod::Size,
            ],
        }
    }
}

impl std::fmt::Display for VerifyMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VerifyMethod::Size => "size",
            VerifyMethod::Checksum => "checksum",
            VerifyMethod::Check => "check",
            VerifyMethod::Cryptcheck => "cryptcheck",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Verification {
    #[serde(default)]
    pub enabled: bool,
    /// Verify right after every scheduled run
    #[serde(default)]
    pub auto_verify: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<VerifyMethod>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Retention {
    /// rclone: delete remote files older than this many days
    #[serde(default, skip_serializing_if = "is_zero")]
    pub keep_days: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub keep_daily: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub keep_weekly: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub keep_monthly: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Notifications {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub on_failure: bool,
    #[serde(default)]
    pub on_success: bool,
    #[serde(default, skip_serializing_if = "is_default")]
    pub email: EmailConfig,
}

/// Per-backup email fields; empty values fall back to the global settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EmailConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub to: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp: Option<SmtpOverride>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SmtpOverride {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host: String,
    #[serde(default, skip_serializing_if = "is_zero_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<bool>,
}

/// Shell snippets run around a backup. These are trusted local scripts
/// executed with `sh -c`; nothing is sandboxed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Hooks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_backup: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_backup: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<String>,
}

impl BackupConfig {
    pub fn new(name: impl Into<String>, engine: Engine, schedule: impl Into<String>, source: Vec<String>) -> Self {
        Self {
            name: name.into(),
            engine,
            schedule: schedule.into(),
            source,
            verification: Verification::default(),
            retention: Retention::default(),
            notifications: Notifications::default(),
            hooks: Hooks::default(),
            environment: Vec::new(),
        }
    }

    pub fn backup_type(&self) -> BackupType {
        self.engine.backup_type()
    }

    pub fn destination(&self) -> &str {
        self.engine.destination()
    }

    /// Verification method, falling back to the engine default
    pub fn verify_method(&self) -> VerifyMethod {
        self.verification
            .method
            .unwrap_or_else(|| VerifyMethod::supported_by(self.backup_type())[0])
    }

    /// Parsed `environment` entries, skipping malformed ones
    pub fn env_pairs(&self) -> Vec<(String, String)> {
        self.environment
            .iter()
            .filter_map(|entry| parse_env_entry(entry))
            .collect()
    }

    /// Retention actually applied by cleanup.
    ///
    /// `retention` is authoritative; restic configs written before it existed
    /// kept daily/weekly counts under `options`, which fill in zero fields.
    pub fn effective_retention(&self) -> Retention {
        let mut retention = self.retention.clone();
        if let Engine::Restic { options, .. } = &self.engine {
            if retention.keep_daily == 0 {
                retention.keep_daily = options.keep_daily;
            }
            if retention.keep_weekly == 0 {
                retention.keep_weekly = options.keep_weekly;
            }
        }
        retention
    }

    /// Whether cleanup has anything to do for this backup
    pub fn has_retention(&self) -> bool {
        let retention = self.effective_retention();
        match self.backup_type() {
            BackupType::Rsync => false,
            BackupType::Restic => {
                retention.keep_daily > 0 || retention.keep_weekly > 0 || retention.keep_monthly > 0
            }
            BackupType::Rclone => retention.keep_days > 0,
        }
    }
}

/// Split a `KEY=VALUE` entry. The key must be non-empty.
pub fn parse_env_entry(entry: &str) -> Option<(String, String)> {
    let (key, value) = entry.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

fn is_zero_port(value: &u16) -> bool {
    *value == 0
}
