//! Process-wide settings (`config.toml`)
//!
//! Holds the email defaults every backup falls back to, plus logging and lock
//! locations. A missing file means "all defaults". Email keys can be
//! overridden from the command line or `QH_EMAIL_*` variables through
//! [`EmailOverrides`].

use super::expand_tilde;
use super::types::EmailConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub email: EmailSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    /// Directory holding per-backup lock files
    #[serde(default)]
    pub lock_directory: Option<PathBuf>,
}

/// Global SMTP server and address defaults
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EmailSettings {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password_file: Option<PathBuf>,
    #[serde(default = "default_tls")]
    pub tls: bool,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_smtp_port(),
            username: String::new(),
            password_file: None,
            tls: default_tls(),
            from: String::new(),
            to: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingSettings {
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_max_files")]
    pub max_files: u32,
    /// Write the log file as JSON lines
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: None,
            level: default_log_level(),
            max_files: default_log_max_files(),
            json: false,
        }
    }
}

/// Email settings after merging one backup's fields over the defaults
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEmail {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password_file: Option<PathBuf>,
    pub tls: bool,
    pub from: String,
    pub to: String,
}

impl EmailSettings {
    /// Merge per-backup email fields over these defaults. Non-empty backup
    /// values win.
    pub fn merged_with(&self, backup: &EmailConfig) -> ResolvedEmail {
        let mut resolved = ResolvedEmail {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password_file: self.password_file.as_deref().map(expand_tilde),
            tls: self.tls,
            from: pick(&backup.from, &self.from),
            to: pick(&backup.to, &self.to),
        };

        if let Some(ref smtp) = backup.smtp {
            if !smtp.host.trim().is_empty() {
                resolved.host = smtp.host.clone();
            }
            if smtp.port != 0 {
                resolved.port = smtp.port;
            }
            if !smtp.username.trim().is_empty() {
                resolved.username = smtp.username.clone();
            }
            if let Some(ref file) = smtp.password_file {
                resolved.password_file = Some(expand_tilde(file));
            }
            if let Some(tls) = smtp.tls {
                resolved.tls = tls;
            }
        }

        resolved
    }
}

fn pick(preferred: &str, fallback: &str) -> String {
    if preferred.trim().is_empty() {
        fallback.to_string()
    } else {
        preferred.to_string()
    }
}

/// Command-line / environment overrides for [`EmailSettings`]
#[derive(Debug, Clone, Default)]
pub struct EmailOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password_file: Option<PathBuf>,
    pub tls: Option<bool>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl EmailOverrides {
    pub fn apply(&self, email: &mut EmailSettings) {
        if let Some(ref host) = self.host {
            email.host = host.clone();
        }
        if let Some(port) = self.port {
            email.port = port;
        }
        if let Some(ref username) = self.username {
            email.username = username.clone();
        }
        if let Some(ref file) = self.password_file {
            email.password_file = Some(file.clone());
        }
        if let Some(tls) = self.tls {
            email.tls = tls;
        }
        if let Some(ref from) = self.from {
            email.from = from.clone();
        }
        if let Some(ref to) = self.to {
            email.to = to.clone();
        }
    }
}

impl Settings {
    /// Load settings from a TOML file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Directory for per-backup lock files
    pub fn lock_directory(&self) -> PathBuf {
        if let Some(ref dir) = self.lock_directory {
            return expand_tilde(dir);
        }
        match dirs::runtime_dir() {
            Some(runtime) => runtime.join("quadlet-helper"),
            None => std::env::temp_dir().join("quadlet-helper-locks"),
        }
    }

    /// Directory for rotated log files
    pub fn log_directory(&self) -> PathBuf {
        if let Some(ref dir) = self.logging.directory {
            return expand_tilde(dir);
        }
        dirs::state_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("state")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quadlet-helper")
            .join("logs")
    }
}

/// Root of all quadlet-helper configuration (`~/.config/quadlet-helper`)
pub fn default_config_root() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("quadlet-helper")
}

fn default_smtp_port() -> u16 { 587 }
fn default_tls() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
