//! Tests for the 'cleanup' command
//!
//! Cleanup applies the retention policy: restic forget/prune or an age-based
//! rclone delete. rsync has no retention.

use quadlet_backup::managers::cleanup::cleanup;
use quadlet_backup::utils::locker::BackupLock;
use test_utils::{BackupError, ConfigBuilder, MockExecutor, MockResponse, Retention, TestContext};

#[test]
fn test_restic_forget_uses_all_counts() {
    let config = ConfigBuilder::restic("volumes")
        .with_retention(Retention {
            keep_daily: 7,
            keep_weekly: 4,
            keep_monthly: 12,
            ..Default::default()
        })
        .build();
    let executor = MockExecutor::new();

    cleanup(&executor, &config, None).unwrap();

    let call = &executor.calls_to("restic")[0];
    assert_eq!(
        call.args,
        vec!["forget", "--prune", "--keep-daily", "7", "--keep-weekly", "4", "--keep-monthly", "12"]
    );
    assert_eq!(call.env_value("RESTIC_REPOSITORY"), Some("/mnt/restic-repo"));
}

#[test]
fn test_restic_without_retention_is_noop() {
    let config = ConfigBuilder::restic("volumes").build();
    let executor = MockExecutor::new().without_program("restic");

    cleanup(&executor, &config, None).unwrap();
    assert!(executor.get_calls().is_empty());
}

#[test]
fn test_rclone_delete_by_age() {
    let config = ConfigBuilder::rclone("photos")
        .with_retention(Retention {
            keep_days: 30,
            ..Default::default()
        })
        .build();
    let executor = MockExecutor::new();

    cleanup(&executor, &config, None).unwrap();
    assert_eq!(
        executor.calls_to("rclone")[0].args,
        vec!["delete", "gdrive:backups", "--min-age", "30d"]
    );
}

#[test]
fn test_cleanup_failure_is_reported() {
    let config = ConfigBuilder::rclone("photos")
        .with_retention(Retention {
            keep_days: 7,
            ..Default::default()
        })
        .build();
    let executor = MockExecutor::new().expect("rclone", MockResponse::fail(1, "permission denied"));

    match cleanup(&executor, &config, None) {
        Err(BackupError::Transfer { output, .. }) => assert!(output.contains("permission denied")),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_cleanup_skips_while_backup_running() {
    let ctx = TestContext::new();
    let config = ConfigBuilder::restic("volumes")
        .with_retention(Retention {
            keep_daily: 3,
            ..Default::default()
        })
        .build();
    let executor = MockExecutor::new();

    let mut running = BackupLock::open(ctx.temp_dir(), "volumes").unwrap();
    let guard = running.try_hold().unwrap();

    assert!(matches!(
        cleanup(&executor, &config, Some(ctx.temp_dir())),
        Err(BackupError::Locked { .. })
    ));
    assert!(!executor.was_called("restic"));

    drop(guard);
    cleanup(&executor, &config, Some(ctx.temp_dir())).unwrap();
    assert!(executor.was_called("restic"));
}
