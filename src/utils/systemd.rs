//! systemd user unit management
//!
//! Each installed backup consists of `<name>-backup.service` (the run),
//! `<name>-backup.timer` (its schedule) and, when failure notifications are
//! on, `backup-notify@<name>.service`, which systemd starts through
//! `OnFailure=`.

use super::command::{CommandOutput, CommandSpec};
use super::executor::CommandExecutor;
use super::schedule::parse_schedule;
use crate::config::BackupConfig;
use crate::error::{BackupError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Prepended so tools installed per-user (`~/.local/bin`) are found
const UNIT_PATH: &str = "%h/.local/bin:/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

pub fn service_name(name: &str) -> String {
    format!("{}-backup.service", name)
}

pub fn timer_name(name: &str) -> String {
    format!("{}-backup.timer", name)
}

pub fn notify_service_name(name: &str) -> String {
    format!("backup-notify@{}.service", name)
}

/// Command prefix the units use to call back into this binary
#[derive(Debug, Clone)]
pub struct Invocation {
    pub executable: PathBuf,
    pub config_root: PathBuf,
}

impl Invocation {
    fn command(&self, args: &str) -> String {
        format!(
            "{} --config-dir {} {}",
            quote(&self.executable.display().to_string()),
            quote(&self.config_root.display().to_string()),
            args
        )
    }
}

/// `<name>-backup.service`
pub fn service_unit(invocation: &Invocation, config: &BackupConfig) -> String {
    let name = &config.name;
    let notify_failure = config.notifications.enabled && config.notifications.on_failure;

    let on_failure = if notify_failure {
        format!("OnFailure={}\n", notify_service_name(name))
    } else {
        String::new()
    };

    let environment: String = config
        .environment
        .iter()
        .map(|entry| format!("Environment={}\n", quote(&entry.replace('%', "%%"))))
        .collect();

    let mut unit = format!(
        "[Unit]
Description=Backup: {name}
Wants=network-online.target
After=network-online.target
{on_failure}
[Service]
Type=oneshot
ExecStart={exec}
Environment=PATH={path}
{environment}StandardOutput=journal
StandardError=journal
",
        name = name,
        on_failure = on_failure,
        exec = invocation.command(&format!("run {} --no-notify", name)),
        path = UNIT_PATH,
        environment = environment,
    );

    if config.verification.enabled && config.verification.auto_verify {
        unit.push_str(&format!(
            "ExecStartPost={}\n",
            invocation.command(&format!("verify {}", name))
        ));
    }
    if config.notifications.enabled && config.notifications.on_success {
        unit.push_str(&format!(
            "ExecStartPost={}\n",
            invocation.command(&format!("notify {} success", name))
        ));
    }
    if config.has_retention() {
        unit.push_str(&format!(
            "ExecStopPost={}\n",
            invocation.command(&format!("cleanup {}", name))
        ));
    }

    unit
}

/// `<name>-backup.timer`; fails if the schedule cannot be translated
pub fn timer_unit(config: &BackupConfig) -> Result<String> {
    let on_calendar = parse_schedule(&config.schedule)?;
    Ok(format!(
        "[Unit]
Description=Backup timer for {name}

[Timer]
OnCalendar={on_calendar}
Persistent=true
Unit={service}

[Install]
WantedBy=timers.target
",
        name = config.name,
        on_calendar = on_calendar,
        service = service_name(&config.name),
    ))
}

/// `backup-notify@<name>.service`
pub fn notify_unit(invocation: &Invocation, name: &str) -> String {
    format!(
        "[Unit]
Description=Email notification for failed backup: {name}

[Service]
Type=oneshot
ExecStart={exec}
StandardOutput=journal
StandardError=journal
",
        name = name,
        exec = invocation.command(&format!("notify {} failure", name)),
    )
}

/// Quote a unit-file word when it contains whitespace or quotes
fn quote(word: &str) -> String {
    if word.chars().any(|c| c.is_whitespace() || c == '"' || c == '\\') {
        format!("\"{}\"", word.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        word.to_string()
    }
}

/// Default user unit directory (`~/.config/systemd/user`)
pub fn default_unit_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("systemd")
        .join("user")
}

/// Unit files for backups in one systemd user directory
pub struct SystemdUnits<'a> {
    dir: PathBuf,
    executor: &'a dyn CommandExecutor,
}

impl<'a> SystemdUnits<'a> {
    pub fn new(dir: impl Into<PathBuf>, executor: &'a dyn CommandExecutor) -> Self {
        Self {
            dir: dir.into(),
            executor,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn service_path(&self, name: &str) -> PathBuf {
        self.dir.join(service_name(name))
    }

    pub fn timer_path(&self, name: &str) -> PathBuf {
        self.dir.join(timer_name(name))
    }

    pub fn notify_path(&self, name: &str) -> PathBuf {
        self.dir.join(notify_service_name(name))
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.timer_path(name).exists()
    }

    /// Write the units, reload systemd and start the timer.
    /// Returns the files written.
    pub fn install(&self, invocation: &Invocation, config: &BackupConfig) -> Result<Vec<PathBuf>> {
        let name = &config.name;
        let timer = timer_unit(config)?;

        fs::create_dir_all(&self.dir).map_err(|source| BackupError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut files = vec![
            (self.service_path(name), service_unit(invocation, config)),
            (self.timer_path(name), timer),
        ];
        if config.notifications.enabled && config.notifications.on_failure {
            files.push((self.notify_path(name), notify_unit(invocation, name)));
        }

        let mut written = Vec::new();
        for (path, contents) in files {
            fs::write(&path, contents).map_err(|source| BackupError::Io {
                path: path.clone(),
                source,
            })?;
            info!("Wrote {:?}", path);
            written.push(path);
        }

        self.systemctl(&["daemon-reload"])?;
        self.systemctl(&["enable", "--now", &timer_name(name)])?;
        Ok(written)
    }

    /// Stop and disable the timer, remove the unit files and reload.
    /// Returns the files removed.
    pub fn uninstall(&self, name: &str) -> Result<Vec<PathBuf>> {
        if let Err(e) = self.systemctl(&["disable", "--now", &timer_name(name)]) {
            warn!("Could not disable {}: {}", timer_name(name), e);
        }

        let mut removed = Vec::new();
        for path in [self.timer_path(name), self.service_path(name), self.notify_path(name)] {
            if !path.exists() {
                continue;
            }
            fs::remove_file(&path).map_err(|source| BackupError::Io {
                path: path.clone(),
                source,
            })?;
            info!("Removed {:?}", path);
            removed.push(path);
        }

        self.systemctl(&["daemon-reload"])?;
        Ok(removed)
    }

    /// `systemctl --user <args>`, failing on a non-zero exit
    pub fn systemctl(&self, args: &[&str]) -> Result<CommandOutput> {
        let spec = CommandSpec::new("systemctl").arg("--user").args(args.iter().copied());
        let output = self.executor.run(&spec)?;
        if output.success() {
            Ok(output)
        } else {
            Err(BackupError::Transfer {
                context: spec.display(),
                status: output.status(),
                output: output.combined(),
            })
        }
    }

    /// Timer and service status text. Inactive units exit non-zero, which
    /// is not treated as an error here.
    pub fn status(&self, name: &str) -> Result<String> {
        let spec = CommandSpec::new("systemctl").args([
            "--user".to_string(),
            "--no-pager".to_string(),
            "status".to_string(),
            timer_name(name),
            service_name(name),
        ]);
        Ok(self.executor.run(&spec)?.combined())
    }

    /// Last `lines` journal lines of the backup service
    pub fn journal(&self, name: &str, lines: usize) -> Result<String> {
        let spec = CommandSpec::new("journalctl").args([
            "--user".to_string(),
            "-u".to_string(),
            service_name(name),
            "-n".to_string(),
            lines.to_string(),
            "--no-pager".to_string(),
        ]);
        let output = self.executor.run(&spec)?;
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(BackupError::Transfer {
                context: spec.display(),
                status: output.status(),
                output: output.combined(),
            })
        }
    }
}
