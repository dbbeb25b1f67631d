//! Tests for the 'install', 'uninstall' and 'status' commands

use quadlet_backup::utils::systemd::{Invocation, SystemdUnits};
use test_utils::{fixtures, BackupError, MockExecutor, MockResponse, TestContext};

fn invocation(ctx: &TestContext) -> Invocation {
    Invocation {
        executable: "/usr/bin/qh-backup".into(),
        config_root: ctx.temp_dir().to_path_buf(),
    }
}

#[test]
fn test_install_from_stored_config() {
    let ctx = TestContext::new();
    ctx.write_backup_yaml("documents", fixtures::rsync_backup_yaml());
    let config = ctx.store().load("documents").unwrap();

    let executor = MockExecutor::new();
    let unit_dir = ctx.create_subdir("systemd/user");
    let units = SystemdUnits::new(&unit_dir, &executor);

    let written = units.install(&invocation(&ctx), &config).unwrap();
    // No failure notifications, so no notify unit
    assert_eq!(written.len(), 2);

    let service = ctx.read_file("systemd/user/documents-backup.service").unwrap();
    assert!(service.contains("run documents --no-notify"));
    assert!(service.contains("Environment=LANG=C"));
    assert!(service.contains("verify documents"));
    assert!(!service.contains("OnFailure="));
    // rsync has no retention, so no cleanup step
    assert!(!service.contains("ExecStopPost"));

    let timer = ctx.read_file("systemd/user/documents-backup.timer").unwrap();
    assert!(timer.contains("OnCalendar=*-*-* 02:00:00"));
}

#[test]
fn test_install_with_failure_notifications() {
    let ctx = TestContext::new();
    ctx.write_backup_yaml("volumes", fixtures::restic_legacy_retention_yaml());
    let config = ctx.store().load("volumes").unwrap();

    let executor = MockExecutor::new();
    let units = SystemdUnits::new(ctx.temp_dir().join("units"), &executor);
    units.install(&invocation(&ctx), &config).unwrap();

    let service = ctx.read_file("units/volumes-backup.service").unwrap();
    assert!(service.contains("OnFailure=backup-notify@volumes.service"));
    assert!(service.contains("cleanup volumes"));

    let notify = ctx.read_file("units/backup-notify@volumes.service").unwrap();
    assert!(notify.contains("notify volumes failure"));

    let timer = ctx.read_file("units/volumes-backup.timer").unwrap();
    assert!(timer.contains("OnCalendar=Sun *-*-* 03:00:00"));
}

#[test]
fn test_enable_failure_is_reported() {
    let ctx = TestContext::new();
    ctx.write_backup_yaml("photos", fixtures::rclone_multi_source_yaml());
    let config = ctx.store().load("photos").unwrap();

    let executor = MockExecutor::new()
        .expect("systemctl", MockResponse::ok(""))
        .expect("systemctl", MockResponse::fail(1, "Failed to connect to bus"));
    let units = SystemdUnits::new(ctx.temp_dir().join("units"), &executor);

    match units.install(&invocation(&ctx), &config) {
        Err(BackupError::Transfer { output, .. }) => {
            assert!(output.contains("Failed to connect to bus"))
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_uninstall_tolerates_inactive_timer() {
    let ctx = TestContext::new();
    let executor = MockExecutor::new()
        .expect("systemctl", MockResponse::fail(1, "Unit photos-backup.timer not loaded."));
    let units = SystemdUnits::new(ctx.temp_dir(), &executor);

    let removed = units.uninstall("photos").unwrap();
    assert!(removed.is_empty());

    let calls = executor.calls_to("systemctl");
    assert_eq!(calls[0].args, vec!["--user", "disable", "--now", "photos-backup.timer"]);
    assert_eq!(calls[1].args, vec!["--user", "daemon-reload"]);
}

#[test]
fn test_status_of_inactive_unit() {
    let executor = MockExecutor::new()
        .expect("systemctl", MockResponse::fail(3, "○ photos-backup.timer - inactive (dead)"));
    let units = SystemdUnits::new("/tmp", &executor);

    let status = units.status("photos").unwrap();
    assert!(status.contains("inactive (dead)"));
    assert_eq!(
        executor.calls_to("systemctl")[0].args,
        vec!["--user", "--no-pager", "status", "photos-backup.timer", "photos-backup.service"]
    );
}
