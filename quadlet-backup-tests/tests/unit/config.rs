//! Unit tests for the backup configuration model and its validation

use quadlet_backup::config::{EmailSettings, Engine, VerifyMethod};
use test_utils::{
    rclone_multi_source_yaml, restic_legacy_retention_yaml, rsync_backup_yaml, BackupConfig,
    BackupError, BackupType, ConfigBuilder, ResultAssertions,
};

fn mail_defaults() -> EmailSettings {
    EmailSettings {
        host: "smtp.example.com".to_string(),
        from: "qh@example.com".to_string(),
        ..Default::default()
    }
}

#[test]
fn test_rclone_requires_remote() {
    let config = ConfigBuilder::rclone("photos").destination("").build();
    config.validate().assert_err_contains("destination.remote");

    let config = ConfigBuilder::rclone("photos").destination("gdrive:photos").build();
    config.validate().assert_ok();
}

#[test]
fn test_each_engine_names_its_destination() {
    ConfigBuilder::rsync("a")
        .destination(" ")
        .build()
        .validate()
        .assert_err_contains("destination.path");
    ConfigBuilder::restic("b")
        .destination("")
        .build()
        .validate()
        .assert_err_contains("destination.repository");
}

#[test]
fn test_notifications_need_recipient_and_server() {
    let mut config = ConfigBuilder::rsync("docs").notify_failures("").build();
    config
        .validate_with(&mail_defaults())
        .assert_err_contains("email.to");

    config.notifications.email.to = "ops@example.com".to_string();
    config.validate().assert_err_contains("smtp.host");
    config.validate_with(&mail_defaults()).assert_ok();

    // A per-backup server works without any defaults
    let config = ConfigBuilder::rsync("docs")
        .notify_failures("ops@example.com")
        .smtp("mail.internal", 2525)
        .build();
    config.validate().assert_ok();
}

#[test]
fn test_disabled_notifications_are_not_checked() {
    let mut config = ConfigBuilder::rsync("docs").build();
    config.notifications.on_failure = true;
    config.validate().assert_ok();
}

#[test]
fn test_schedule_syntax_is_not_validated() {
    let config = ConfigBuilder::rsync("docs").schedule("whenever").build();
    config.validate().assert_ok();

    let config = ConfigBuilder::rsync("docs").schedule("  ").build();
    config.validate().assert_err_contains("schedule is required");
}

#[test]
fn test_empty_sources() {
    let config = ConfigBuilder::rsync("docs").sources(&[]).build();
    config.validate().assert_err_contains("source");
}

#[test]
fn test_verify_method_must_match_engine() {
    ConfigBuilder::rsync("docs")
        .verify_with(VerifyMethod::Cryptcheck)
        .build()
        .validate()
        .assert_err_contains("not supported for rsync");
    ConfigBuilder::rclone("photos")
        .verify_with(VerifyMethod::Size)
        .build()
        .validate()
        .assert_ok();
}

#[test]
fn test_default_verify_methods() {
    assert_eq!(ConfigBuilder::rsync("a").build().verify_method(), VerifyMethod::Size);
    assert_eq!(ConfigBuilder::rclone("b").build().verify_method(), VerifyMethod::Check);
    assert_eq!(ConfigBuilder::restic("c").build().verify_method(), VerifyMethod::Check);
}

#[test]
fn test_environment_entries() {
    ConfigBuilder::rsync("docs")
        .env("=oops")
        .build()
        .validate()
        .assert_err_contains("KEY=VALUE");

    let config = ConfigBuilder::rsync("docs")
        .env("RSYNC_RSH=ssh -p 2222")
        .env("EMPTY=")
        .build();
    config.validate().assert_ok();
    assert_eq!(
        config.env_pairs(),
        vec![
            ("RSYNC_RSH".to_string(), "ssh -p 2222".to_string()),
            ("EMPTY".to_string(), String::new()),
        ]
    );
}

#[test]
fn test_rsync_fixture() {
    let config: BackupConfig = serde_yaml::from_str(rsync_backup_yaml()).unwrap();

    assert_eq!(config.backup_type(), BackupType::Rsync);
    assert_eq!(config.destination(), "/mnt/backup");
    assert_eq!(config.source.len(), 2);
    match config.engine {
        Engine::Rsync { ref options, .. } => {
            assert!(options.archive && options.compress && options.delete);
            assert_eq!(options.exclude, vec!["*.tmp", ".cache"]);
        }
        ref other => panic!("unexpected engine: {:?}", other),
    }
    assert!(config.verification.auto_verify);
    assert_eq!(config.hooks.pre_backup.as_deref(), Some("mountpoint -q /mnt/backup"));
    assert!(config.hooks.post_backup.is_none());
}

#[test]
fn test_legacy_restic_retention_is_merged() {
    let config: BackupConfig = serde_yaml::from_str(restic_legacy_retention_yaml()).unwrap();
    let retention = config.effective_retention();

    assert_eq!(retention.keep_daily, 7);
    assert_eq!(retention.keep_weekly, 4);
    assert_eq!(retention.keep_monthly, 6);
    assert!(config.has_retention());
}

#[test]
fn test_retention_record_wins_over_legacy_options() {
    let yaml = restic_legacy_retention_yaml().replace("  keep_monthly: 6", "  keep_daily: 14");
    let config: BackupConfig = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(config.effective_retention().keep_daily, 14);
    assert_eq!(config.effective_retention().keep_weekly, 4);
}

#[test]
fn test_rsync_never_has_retention() {
    let mut config = ConfigBuilder::rsync("docs").build();
    config.retention.keep_days = 30;
    config.retention.keep_daily = 7;
    assert!(!config.has_retention());
}

#[test]
fn test_rclone_smtp_override_fixture() {
    let config: BackupConfig = serde_yaml::from_str(rclone_multi_source_yaml()).unwrap();
    let resolved = EmailSettings::default().merged_with(&config.notifications.email);

    assert_eq!(resolved.host, "smtp.example.com");
    assert_eq!(resolved.port, 465);
    assert_eq!(resolved.username, "backup");
    assert_eq!(resolved.from, "Backups <backup@example.com>");
    assert_eq!(resolved.to, "photos@example.com");
    assert_eq!(config.verify_method(), VerifyMethod::Cryptcheck);
}

#[test]
fn test_unknown_type_is_a_parse_error() {
    let yaml = rsync_backup_yaml().replace("type: rsync", "type: borg");
    assert!(serde_yaml::from_str::<BackupConfig>(&yaml).is_err());
}

#[test]
fn test_foreign_destination_key_is_rejected() {
    let yaml = rsync_backup_yaml().replace("  path: /mnt/backup", "  remote: gdrive:docs");
    assert!(serde_yaml::from_str::<BackupConfig>(&yaml).is_err());
}

#[test]
fn test_validation_error_variant() {
    let config = ConfigBuilder::rsync("").build();
    assert!(matches!(config.validate(), Err(BackupError::Validation(_))));
}
