//! Logging manager with file rotation
//!
//! Two outputs: a concise console layer on stderr at INFO, and a daily-rotated
//! file under the log directory at the configured level. `RUST_LOG` overrides
//! both filters.

use crate::config::{expand_tilde, Settings};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Rotated files are named `qh-backup.log.<date>`
const LOG_FILE_PREFIX: &str = "qh-backup.log";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_directory: PathBuf,
    /// Level for the file layer; the console stays at INFO
    pub log_level: Level,
    /// Rotated files to keep
    pub max_files: u32,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl LoggingConfig {
    /// Unknown level names fall back to INFO
    pub fn from_config(log_directory: &Path, log_level: &str, max_files: u32) -> Self {
        let log_level = match log_level.trim().to_lowercase().as_str() {
            "warning" => Level::WARN,
            other => other.parse().unwrap_or(Level::INFO),
        };

        Self {
            log_directory: log_directory.to_path_buf(),
            log_level,
            max_files,
            json: false,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            json: settings.logging.json,
            ..Self::from_config(
                &settings.log_directory(),
                &settings.logging.level,
                settings.logging.max_files,
            )
        }
    }
}

/// Keeps the background file writer alive; dropping it flushes pending lines.
pub struct LogGuard {
    _file_guard: WorkerGuard,
}

/// Install the console and file layers.
///
/// Fails if the log directory cannot be created or a subscriber is already
/// installed.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard> {
    let log_dir = expand_tilde(&config.log_directory);
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

    let appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);
    let (writer, file_guard) = tracing_appender::non_blocking(appender);

    let file_layer = if config.json {
        fmt::layer()
            .json()
            .with_writer(writer)
            .with_filter(level_filter(config.log_level))
            .boxed()
    } else {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(level_filter(config.log_level))
            .boxed()
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(level_filter(Level::INFO));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    prune_rotated_logs(&log_dir, config.max_files)?;

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

/// Console-only logging at WARN, for commands that must not touch the
/// filesystem or when the log directory is unusable.
pub fn init_console_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // A subscriber may already be installed (tests); keep it
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,quadlet_backup={0},qh_backup={0}", level))
    })
}

/// Remove all but the newest `max_files` rotated logs. The date suffix sorts
/// lexically, so the name order is the age order.
fn prune_rotated_logs(log_dir: &Path, max_files: u32) -> Result<()> {
    let mut rotated: Vec<PathBuf> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(LOG_FILE_PREFIX))
        .map(|entry| entry.path())
        .collect();

    rotated.sort_unstable_by(|a, b| b.cmp(a));

    for path in rotated.into_iter().skip(max_files as usize) {
        match fs::remove_file(&path) {
            Ok(()) => tracing::debug!("Removed old log file: {:?}", path),
            Err(e) => tracing::warn!("Failed to remove old log file {:?}: {}", path, e),
        }
    }

    Ok(())
}
