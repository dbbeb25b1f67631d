//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating backup configurations with sensible defaults.

use quadlet_backup::config::{
    BackupConfig, EmailConfig, Engine, Hooks, Retention, SmtpOverride, VerifyMethod,
};
use std::path::PathBuf;

/// Builder for creating test backup configurations
pub struct ConfigBuilder {
    config: BackupConfig,
}

impl ConfigBuilder {
    /// An rsync backup of `/srv/data` to `/mnt/backup`
    pub fn rsync(name: &str) -> Self {
        Self::with_engine(name, Engine::rsync("/mnt/backup"))
    }

    /// A restic backup of `/srv/data` into a local repository
    pub fn restic(name: &str) -> Self {
        let mut builder = Self::with_engine(name, Engine::restic("/mnt/restic-repo"));
        builder = builder.with_restic_password_file("/etc/restic/password");
        builder
    }

    /// An rclone backup of `/srv/data` to `gdrive:backups`
    pub fn rclone(name: &str) -> Self {
        Self::with_engine(name, Engine::rclone("gdrive:backups"))
    }

    pub fn with_engine(name: &str, engine: Engine) -> Self {
        Self {
            config: BackupConfig::new(name, engine, "daily", vec!["/srv/data".to_string()]),
        }
    }

    /// Replace the source list
    pub fn sources(mut self, sources: &[&str]) -> Self {
        self.config.source = sources.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn schedule(mut self, schedule: &str) -> Self {
        self.config.schedule = schedule.to_string();
        self
    }

    /// Set the engine's destination field, whichever it is
    pub fn destination(mut self, value: &str) -> Self {
        match self.config.engine {
            Engine::Rsync { ref mut destination, .. } => destination.path = value.to_string(),
            Engine::Restic { ref mut destination, .. } => destination.repository = value.to_string(),
            Engine::Rclone { ref mut destination, .. } => destination.remote = value.to_string(),
        }
        self
    }

    pub fn with_restic_password_file(mut self, path: &str) -> Self {
        if let Engine::Restic { ref mut options, .. } = self.config.engine {
            options.password_file = Some(PathBuf::from(path));
        }
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        match self.config.engine {
            Engine::Rsync { ref mut options, .. } => options.exclude.push(pattern.to_string()),
            Engine::Restic { ref mut options, .. } => options.exclude.push(pattern.to_string()),
            Engine::Rclone { ref mut options, .. } => options.exclude.push(pattern.to_string()),
        }
        self
    }

    /// Enable verification with an explicit method
    pub fn verify_with(mut self, method: VerifyMethod) -> Self {
        self.config.verification.enabled = true;
        self.config.verification.method = Some(method);
        self
    }

    pub fn auto_verify(mut self) -> Self {
        self.config.verification.enabled = true;
        self.config.verification.auto_verify = true;
        self
    }

    pub fn with_retention(mut self, retention: Retention) -> Self {
        self.config.retention = retention;
        self
    }

    /// Failure notifications to `to`
    pub fn notify_failures(mut self, to: &str) -> Self {
        self.config.notifications.enabled = true;
        self.config.notifications.on_failure = true;
        self.config.notifications.email = EmailConfig {
            to: to.to_string(),
            ..Default::default()
        };
        self
    }

    pub fn notify_success(mut self) -> Self {
        self.config.notifications.enabled = true;
        self.config.notifications.on_success = true;
        self
    }

    pub fn smtp(mut self, host: &str, port: u16) -> Self {
        self.config.notifications.email.smtp = Some(SmtpOverride {
            host: host.to_string(),
            port,
            ..Default::default()
        });
        self
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.config.hooks = hooks;
        self
    }

    pub fn env(mut self, entry: &str) -> Self {
        self.config.environment.push(entry.to_string());
        self
    }

    pub fn build(self) -> BackupConfig {
        self.config
    }
}
