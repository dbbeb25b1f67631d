//! Error types shared by the backup engines
//!
//! Configuration and validation errors abort immediately. Transfer failures
//! carry whatever output the tool produced so callers can print it and send
//! it along in a failure notification.

use crate::config::BackupType;
use crate::utils::mail::NotifyError;
use std::path::PathBuf;
use thiserror::Error;

/// Which hook a [`BackupError::Hook`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    PreBackup,
    PostBackup,
    OnFailure,
}

impl std::fmt::Display for HookStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HookStage::PreBackup => "pre-backup",
            HookStage::PostBackup => "post-backup",
            HookStage::OnFailure => "on-failure",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Backup configuration '{name}' not found ({})", path.display())]
    ConfigNotFound { name: String, path: PathBuf },

    #[error("Failed to parse backup configuration {}:\n{source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{tool} is not installed or not in PATH\n\n{instructions}")]
    ToolUnavailable {
        tool: BackupType,
        instructions: String,
    },

    #[error("{stage} hook failed ({status})\nOutput: {output}")]
    Hook {
        stage: HookStage,
        status: String,
        output: String,
    },

    #[error("{context} failed ({status})")]
    Transfer {
        context: String,
        status: String,
        output: String,
    },

    #[error("Backup '{name}' is already running (lock held: {})", path.display())]
    Locked { name: String, path: PathBuf },

    #[error("Failed to execute {program}: {source}")]
    Exec {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Notification(#[from] NotifyError),
}

impl BackupError {
    /// Output captured from the failing subprocess, if any
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            BackupError::Hook { output, .. } | BackupError::Transfer { output, .. } => {
                Some(output.as_str())
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
