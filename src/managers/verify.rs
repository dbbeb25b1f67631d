//! Verify engine - compares a backup with its sources
//!
//! A mismatch is not an error: it comes back as a [`VerifyResult`] with
//! `success == false`. Errors are reserved for things like a missing tool.

use crate::config::BackupConfig;
use crate::error::Result;
use crate::strategies::strategy_for;
use crate::utils::executor::CommandExecutor;
use crate::utils::tools;
use tracing::{info, warn};

/// Allowed relative difference between source and destination sizes
pub const SIZE_TOLERANCE_PERCENT: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct VerifyResult {
    pub success: bool,
    pub message: String,
    pub details: String,
}

impl VerifyResult {
    pub fn passed(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: details.into(),
        }
    }

    pub fn failed(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: details.into(),
        }
    }
}

/// Whether `dest` is within ±5% of `source`. An empty source only matches an
/// empty destination.
pub fn within_size_tolerance(source: u64, dest: u64) -> bool {
    if source == 0 {
        return dest == 0;
    }
    let diff = (source as f64 - dest as f64).abs() * 100.0 / source as f64;
    diff <= SIZE_TOLERANCE_PERCENT
}

/// Verify a backup with its configured (or default) method
pub fn verify(executor: &dyn CommandExecutor, config: &BackupConfig) -> Result<VerifyResult> {
    if !config.verification.enabled {
        return Ok(VerifyResult::passed("Verification disabled", ""));
    }

    tools::ensure_available(executor, config.backup_type())?;

    let method = config.verify_method();
    info!("Verifying '{}' ({}, method {})", config.name, config.backup_type(), method);

    let result = strategy_for(config, executor).verify(method)?;
    if result.success {
        info!("Verification of '{}' passed: {}", config.name, result.message);
    } else {
        warn!("Verification of '{}' failed: {}", config.name, result.message);
    }
    Ok(result)
}
