//! Test fixtures and sample data
//!
//! Configuration files as users write them by hand.

/// rsync backup with every option set
pub fn rsync_backup_yaml() -> &'static str {
    r#"name: documents
type: rsync
schedule: daily 02:00
source:
  - /home/user/Documents
  - /home/user/Pictures/
destination:
  path: /mnt/backup
options:
  archive: true
  compress: true
  delete: true
  exclude:
    - "*.tmp"
    - .cache
verification:
  enabled: true
  auto_verify: true
  method: size
hooks:
  pre_backup: mountpoint -q /mnt/backup
  on_failure: logger -t backup "documents failed"
environment:
  - LANG=C
"#
}

/// restic backup using the legacy `options.keep_*` retention fields
pub fn restic_legacy_retention_yaml() -> &'static str {
    r#"name: volumes
type: restic
schedule: weekly sun 03:00
source:
  - /var/lib/containers/storage/volumes
destination:
  repository: sftp:backup@nas:/restic
options:
  password_file: ~/.config/restic/password
  keep_daily: 7
  keep_weekly: 4
retention:
  keep_monthly: 6
notifications:
  enabled: true
  on_failure: true
  email:
    to: ops@example.com
"#
}

/// rclone backup of several sources with an SMTP override
pub fn rclone_multi_source_yaml() -> &'static str {
    r#"name: photos
type: rclone
schedule: "*-*-* 04:30:00"
source:
  - /srv/photos
  - /srv/videos
  - /srv/scans
destination:
  remote: "gdrive:"
options:
  transfers: 8
  checkers: 16
  bandwidth_limit: 10M
verification:
  enabled: true
  method: cryptcheck
retention:
  keep_days: 30
notifications:
  enabled: true
  on_failure: true
  on_success: true
  email:
    to: photos@example.com
    from: Backups <backup@example.com>
    smtp:
      host: smtp.example.com
      port: 465
      username: backup
      password_file: /etc/qh/smtp-password
      tls: true
"#
}

/// Process-wide settings
pub fn settings_toml() -> &'static str {
    r#"lock_directory = "/run/user/1000/qh-locks"

[email]
host = "mail.example.com"
port = 25
tls = false
from = "qh@example.com"
to = "root@example.com"

[logging]
level = "debug"
max_files = 3
"#
}
