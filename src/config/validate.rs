//! Configuration validation
//!
//! Validation is offline: it never touches the filesystem or the network and
//! does not interpret `schedule`. The schedule is translated (and rejected if
//! malformed) only when systemd units are generated.

use super::settings::EmailSettings;
use super::types::{parse_env_entry, BackupConfig, Engine, VerifyMethod};
use crate::error::{BackupError, Result};

impl BackupConfig {
    /// Validate against empty email defaults
    pub fn validate(&self) -> Result<()> {
        self.validate_with(&EmailSettings::default())
    }

    /// Validate, resolving notification fields against the global email settings.
    /// Returns the first violated rule.
    pub fn validate_with(&self, defaults: &EmailSettings) -> Result<()> {
        if self.name.trim().is_empty() {
            return invalid("backup name is required");
        }

        if self.name.contains('/') || self.name.starts_with('.') {
            return invalid(format!(
                "backup name '{}' must not contain '/' or start with '.'",
                self.name
            ));
        }

        if self.source.is_empty() || self.source.iter().all(|s| s.trim().is_empty()) {
            return invalid("at least one source path is required");
        }

        match &self.engine {
            Engine::Rclone { destination, .. } if destination.remote.trim().is_empty() => {
                return invalid("destination.remote is required for rclone backups");
            }
            Engine::Rsync { destination, .. } if destination.path.trim().is_empty() => {
                return invalid("destination.path is required for rsync backups");
            }
            Engine::Restic { destination, .. } if destination.repository.trim().is_empty() => {
                return invalid("destination.repository is required for restic backups");
            }
            _ => {}
        }

        if self.schedule.trim().is_empty() {
            return invalid("schedule is required");
        }

        if let Some(method) = self.verification.method {
            let supported = VerifyMethod::supported_by(self.backup_type());
            if !supported.contains(&method) {
                let names: Vec<String> = supported.iter().map(|m| m.to_string()).collect();
                return invalid(format!(
                    "verification method '{}' is not supported for {} backups (use {})",
                    method,
                    self.backup_type(),
                    names.join(", ")
                ));
            }
        }

        if let Some(bad) = self.environment.iter().find(|e| parse_env_entry(e).is_none()) {
            return invalid(format!("environment entry '{}' must be KEY=VALUE", bad));
        }

        if self.notifications.enabled {
            let resolved = defaults.merged_with(&self.notifications.email);
            if resolved.to.trim().is_empty() {
                return invalid("email.to is required when notifications are enabled");
            }
            if resolved.host.trim().is_empty() {
                return invalid("email.smtp.host is required when notifications are enabled");
            }
            if resolved.port == 0 {
                return invalid("email.smtp.port is required when notifications are enabled");
            }
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> Result<()> {
    Err(BackupError::Validation(message.into()))
}
