//! Tests for the 'verify' command
//!
//! Verification compares source and destination with the configured method.
//! Differences are a failed result, not an error.

use quadlet_backup::managers::verify::verify;
use test_utils::{BackupError, ConfigBuilder, MockExecutor, MockResponse, VerifyMethod};

#[test]
fn test_disabled_verification_is_a_noop() {
    let config = ConfigBuilder::rsync("docs").build();
    let executor = MockExecutor::new().without_program("rsync");

    let result = verify(&executor, &config).unwrap();
    assert!(result.success);
    assert_eq!(result.message, "Verification disabled");
    assert!(executor.get_calls().is_empty());
}

#[test]
fn test_rsync_size_within_tolerance() {
    let config = ConfigBuilder::rsync("docs")
        .sources(&["/srv/docs"])
        .verify_with(VerifyMethod::Size)
        .build();
    let executor = MockExecutor::new()
        .expect("du", MockResponse::ok("1000\t/srv/docs\n"))
        .expect("du", MockResponse::ok("951\t/mnt/backup/docs\n"));

    let result = verify(&executor, &config).unwrap();
    assert!(result.success, "{}", result.message);

    let calls = executor.calls_to("du");
    assert_eq!(calls[1].args, vec!["-sb", "/mnt/backup/docs"]);
}

#[test]
fn test_rsync_size_outside_tolerance() {
    let config = ConfigBuilder::rsync("docs")
        .sources(&["/srv/docs"])
        .verify_with(VerifyMethod::Size)
        .build();
    // 5.1% smaller
    let executor = MockExecutor::new()
        .expect("du", MockResponse::ok("1000\t/srv/docs\n"))
        .expect("du", MockResponse::ok("949\t/mnt/backup/docs\n"));

    let result = verify(&executor, &config).unwrap();
    assert!(!result.success);
    assert!(result.message.contains("Size mismatch"));
    assert!(result.message.contains("/srv/docs"));
}

#[test]
fn test_rsync_remote_destination_is_skipped() {
    let config = ConfigBuilder::rsync("docs")
        .destination("backup@nas:/volume1/docs")
        .verify_with(VerifyMethod::Size)
        .build();
    let executor = MockExecutor::new().expect("du", MockResponse::ok("4096\t/srv/data\n"));

    let result = verify(&executor, &config).unwrap();
    assert!(result.success);
    assert!(result.details.contains("remote verification not supported"));
    assert_eq!(executor.call_count("du"), 1);
}

#[test]
fn test_rsync_checksum_differences() {
    let config = ConfigBuilder::rsync("docs")
        .verify_with(VerifyMethod::Checksum)
        .build();
    let executor = MockExecutor::new().expect("rsync", MockResponse::ok(">fc.T...... report.pdf\n"));

    let result = verify(&executor, &config).unwrap();
    assert!(!result.success);
    assert!(result.details.contains("report.pdf"));
    assert!(executor.calls_to("rsync")[0].has_arg("--checksum"));
}

#[test]
fn test_rsync_checksum_clean() {
    let config = ConfigBuilder::rsync("docs")
        .verify_with(VerifyMethod::Checksum)
        .build();
    let executor = MockExecutor::new();

    assert!(verify(&executor, &config).unwrap().success);
}

#[test]
fn test_restic_check_failure_keeps_output() {
    let config = ConfigBuilder::restic("volumes").verify_with(VerifyMethod::Check).build();
    let executor = MockExecutor::new().expect("restic", MockResponse::fail(1, "pack 1a2b is damaged"));

    let result = verify(&executor, &config).unwrap();
    assert!(!result.success);
    assert!(result.details.contains("pack 1a2b is damaged"));
    assert_eq!(executor.calls_to("restic")[0].args, vec!["check"]);
}

#[test]
fn test_rclone_check_attempts_every_source() {
    let config = ConfigBuilder::rclone("media")
        .sources(&["/srv/photos", "/srv/videos", "/srv/music"])
        .verify_with(VerifyMethod::Check)
        .build();
    let executor = MockExecutor::new()
        .expect("rclone", MockResponse::ok("photos: 0 differences"))
        .expect("rclone", MockResponse::fail(1, "videos: 2 differences"))
        .expect("rclone", MockResponse::ok("music: 0 differences"));

    let result = verify(&executor, &config).unwrap();

    assert!(!result.success);
    assert_eq!(executor.call_count("rclone"), 3);
    assert!(result.details.contains("photos: 0 differences"));
    assert!(result.details.contains("videos: 2 differences"));
    assert!(result.details.contains("music: 0 differences"));

    let calls = executor.calls_to("rclone");
    assert_eq!(calls[2].args, vec!["check", "/srv/music", "gdrive:backups/music"]);
}

#[test]
fn test_rclone_check_continues_after_spawn_failure() {
    let config = ConfigBuilder::rclone("media")
        .sources(&["/srv/photos", "/srv/videos", "/srv/music"])
        .verify_with(VerifyMethod::Check)
        .build();
    let executor = MockExecutor::new()
        .expect("rclone", MockResponse::ok("photos: 0 differences"))
        .expect("rclone", MockResponse::SpawnError)
        .expect("rclone", MockResponse::ok("music: 0 differences"));

    let result = verify(&executor, &config).unwrap();

    assert!(!result.success);
    assert_eq!(executor.call_count("rclone"), 3);
    assert!(result.details.contains("photos: 0 differences"));
    assert!(result.details.contains("✗ /srv/videos"));
    assert!(result.details.contains("music: 0 differences"));
}

#[test]
fn test_rclone_size_compares_counts_and_bytes() {
    let config = ConfigBuilder::rclone("photos")
        .verify_with(VerifyMethod::Size)
        .build();
    let executor = MockExecutor::new()
        .expect("rclone", MockResponse::ok(r#"{"count":10,"bytes":2048}"#))
        .expect("rclone", MockResponse::ok(r#"{"count":9,"bytes":2048}"#));

    let result = verify(&executor, &config).unwrap();
    assert!(!result.success);
    assert!(result.details.contains("source=10 objects"));
}

#[test]
fn test_missing_tool_is_an_error() {
    let config = ConfigBuilder::rclone("photos").verify_with(VerifyMethod::Check).build();
    let executor = MockExecutor::new().without_program("rclone");

    assert!(matches!(
        verify(&executor, &config),
        Err(BackupError::ToolUnavailable { .. })
    ));
}
