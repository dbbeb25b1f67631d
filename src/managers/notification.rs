//! Email notification manager
//!
//! Sends a backup report (HTML with a plain-text alternative) when a run
//! finishes, subject to the backup's `notifications` flags.

use crate::config::{BackupConfig, EmailSettings};
use crate::utils::mail::{MailTransport, NotifyError, OutgoingMail, SmtpServer};
use chrono::{DateTime, Duration, Local};
use handlebars::Handlebars;
use serde_json::json;
use std::fs;
use tracing::{debug, info};

const REPORT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<style>
  body { font-family: sans-serif; }
  .container { padding: 20px; border: 1px solid #ddd; border-radius: 5px; max-width: 600px; margin: auto; }
  .status { font-size: 20px; font-weight: bold; }
  .status.success { color: green; }
  .status.failure { color: red; }
  .status.test { color: blue; }
  .details { background-color: #f5f5f5; padding: 15px; border-radius: 3px; white-space: pre-wrap; font-family: monospace; }
  table { border-collapse: collapse; width: 100%; margin-bottom: 20px; border: 1px solid #ddd; }
  th, td { text-align: left; padding: 8px; border: 1px solid #ddd; }
  th { background-color: #f2f2f2; }
  ul { margin: 0; padding-left: 20px; }
</style>
</head>
<body>
<div class="container">
  <h2>Backup Report</h2>
  <p><span class="status {{status_class}}">{{status}}</span></p>
  <table>
    <tr><th>Backup Name</th><td>{{name}}</td></tr>
    <tr><th>Backup Type</th><td>{{backup_type}}</td></tr>
    <tr><th>Timestamp</th><td>{{timestamp}}</td></tr>
    <tr><th>Sources</th><td>{{#if many_sources}}<ul>{{#each sources}}<li>{{this}}</li>{{/each}}</ul>{{else}}{{#each sources}}{{this}}{{/each}}{{/if}}</td></tr>
    <tr><th>Destination</th><td>{{destination}}</td></tr>
    <tr><th>Schedule</th><td>{{schedule}}</td></tr>
  </table>
  {{#if details}}
  <h3>Details:</h3>
  <pre class="details">{{details}}</pre>
  {{/if}}
  <p><small>This is an automated message from quadlet-helper.</small></p>
</div>
</body>
</html>
"#;

/// Kind of report being sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyStatus {
    Success,
    Failure,
    Test,
}

impl std::fmt::Display for NotifyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NotifyStatus::Success => "success",
            NotifyStatus::Failure => "failure",
            NotifyStatus::Test => "test",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for NotifyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "success" => Ok(NotifyStatus::Success),
            "failure" => Ok(NotifyStatus::Failure),
            other => Err(format!("invalid status: {} (must be success or failure)", other)),
        }
    }
}

/// Notification manager for sending backup emails
pub struct Notifier {
    defaults: EmailSettings,
    transport: Box<dyn MailTransport>,
}

impl Notifier {
    pub fn new(defaults: EmailSettings, transport: Box<dyn MailTransport>) -> Self {
        Self {
            defaults,
            transport,
        }
    }

    /// Whether a report with `status` should go out for this backup
    pub fn is_enabled(config: &BackupConfig, status: NotifyStatus) -> bool {
        let notifications = &config.notifications;
        if !notifications.enabled {
            return false;
        }
        match status {
            NotifyStatus::Success => notifications.on_success,
            NotifyStatus::Failure => notifications.on_failure,
            NotifyStatus::Test => true,
        }
    }

    /// Send a success/failure report if the backup's flags allow it.
    /// Returns whether a message was sent.
    pub fn send_notification(
        &self,
        config: &BackupConfig,
        status: NotifyStatus,
        details: &str,
    ) -> Result<bool, NotifyError> {
        if !Self::is_enabled(config, status) {
            debug!("{} notification for '{}' not enabled, skipping", status, config.name);
            return Ok(false);
        }

        let subject = format!("Backup {}: {}", status.to_string().to_uppercase(), config.name);
        self.deliver(config, status, subject, details)?;
        Ok(true)
    }

    /// Send a test report regardless of the on-success/on-failure flags
    pub fn send_test(&self, config: &BackupConfig) -> Result<(), NotifyError> {
        let subject = format!("Test Email from quadlet-helper: {}", config.name);
        self.deliver(
            config,
            NotifyStatus::Test,
            subject,
            "This is a test email to verify your notification settings.",
        )
    }

    fn deliver(
        &self,
        config: &BackupConfig,
        status: NotifyStatus,
        subject: String,
        details: &str,
    ) -> Result<(), NotifyError> {
        let resolved = self.defaults.merged_with(&config.notifications.email);

        if resolved.from.trim().is_empty() {
            return Err(NotifyError::MissingSender);
        }
        if resolved.to.trim().is_empty() {
            return Err(NotifyError::MissingRecipient);
        }

        let password = match resolved.password_file {
            Some(ref path) => fs::read_to_string(path)
                .map_err(|source| NotifyError::PasswordFile {
                    path: path.clone(),
                    source,
                })?
                .trim()
                .to_string(),
            None => String::new(),
        };

        let now = Local::now();
        let mail = OutgoingMail {
            from: resolved.from.clone(),
            to: resolved.to.clone(),
            subject,
            text: render_text(config, status, details, &now),
            html: render_html(config, status, details, &now)?,
        };

        let server = SmtpServer {
            host: resolved.host,
            port: resolved.port,
            username: resolved.username,
            password,
            tls: resolved.tls,
        };

        info!("Sending {} notification for '{}' to {}", status, config.name, mail.to);
        self.transport.send(&server, &mail)
    }
}

/// RFC 1123 with numeric zone, e.g. `Mon, 02 Jan 2006 15:04:05 -0700`
fn format_timestamp(time: &DateTime<Local>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S %z").to_string()
}

/// HTML body of a report
pub fn render_html(
    config: &BackupConfig,
    status: NotifyStatus,
    details: &str,
    time: &DateTime<Local>,
) -> Result<String, NotifyError> {
    let data = json!({
        "status": status.to_string().to_uppercase(),
        "status_class": status.to_string(),
        "name": config.name,
        "backup_type": config.backup_type().to_string(),
        "timestamp": format_timestamp(time),
        "sources": config.source,
        "many_sources": config.source.len() > 1,
        "destination": config.destination(),
        "schedule": config.schedule,
        "details": details,
    });

    Handlebars::new()
        .render_template(REPORT_TEMPLATE, &data)
        .map_err(|e| NotifyError::Render(e.to_string()))
}

/// Plain-text alternative of a report
pub fn render_text(
    config: &BackupConfig,
    status: NotifyStatus,
    details: &str,
    time: &DateTime<Local>,
) -> String {
    let mut text = format!(
        "Backup Report: {}\n\nBackup Name: {}\nBackup Type: {}\nTimestamp:   {}\nSources:     {}\nDestination: {}\nSchedule:    {}\n",
        status.to_string().to_uppercase(),
        config.name,
        config.backup_type(),
        format_timestamp(time),
        config.source.join(", "),
        config.destination(),
        config.schedule,
    );
    if !details.is_empty() {
        text.push_str("\nDetails:\n");
        text.push_str(details);
        text.push('\n');
    }
    text.push_str("\nThis is an automated message from quadlet-helper.\n");
    text
}

/// Elapsed time as its two most significant non-zero units, e.g. `45s`,
/// `2m 5s`, `1h 2m` or `3d 4h`. Negative durations read as `0s`.
pub fn format_duration(elapsed: Duration) -> String {
    let total = elapsed.num_seconds().max(0);
    let units = [
        ("d", total / 86_400),
        ("h", total / 3_600 % 24),
        ("m", total / 60 % 60),
        ("s", total % 60),
    ];

    let parts: Vec<String> = units
        .iter()
        .skip_while(|(_, n)| *n == 0)
        .take(2)
        .filter(|(_, n)| *n > 0)
        .map(|(unit, n)| format!("{}{}", n, unit))
        .collect();

    if parts.is_empty() {
        "0s".to_string()
    } else {
        parts.join(" ")
    }
}
