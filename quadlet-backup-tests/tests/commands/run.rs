//! Tests for the 'run' command
//!
//! A run loads a configuration, then dispatches to the backup tool with
//! hooks around the transfer.

use quadlet_backup::managers::backup::BackupManager;
use test_utils::{
    BackupError, ConfigBuilder, Hooks, HookStage, MockExecutor, MockResponse, TestContext,
};

#[test]
fn test_run_loaded_config() {
    let ctx = TestContext::with_configs(&[ConfigBuilder::rsync("docs").exclude("*.tmp").build()]);
    let config = ctx.store().load("docs").unwrap();

    let executor = MockExecutor::new().expect("rsync", MockResponse::ok("sent 42 bytes"));
    let result = BackupManager::new(&executor).run(&config, false);

    assert!(result.success());
    assert_eq!(result.output, "sent 42 bytes");

    let call = &executor.calls_to("rsync")[0];
    assert!(call.tee);
    assert_eq!(
        call.args,
        vec!["-v", "--progress", "--exclude", "*.tmp", "/srv/data", "/mnt/backup"]
    );
}

#[test]
fn test_rsync_dry_run_flag() {
    let config = ConfigBuilder::rsync("docs").build();
    let executor = MockExecutor::new();

    BackupManager::new(&executor).run(&config, true).into_result().unwrap();
    assert_eq!(executor.calls_to("rsync")[0].args[0], "--dry-run");
}

#[test]
fn test_restic_environment_and_arguments() {
    let config = ConfigBuilder::restic("volumes")
        .sources(&["/srv/a", "/srv/b"])
        .exclude("*.log")
        .env("RESTIC_COMPRESSION=max")
        .build();
    let executor = MockExecutor::new();

    BackupManager::new(&executor).run(&config, false).into_result().unwrap();

    let call = &executor.calls_to("restic")[0];
    assert_eq!(call.args, vec!["backup", "--exclude", "*.log", "/srv/a", "/srv/b"]);
    assert_eq!(call.env_value("RESTIC_REPOSITORY"), Some("/mnt/restic-repo"));
    assert_eq!(call.env_value("RESTIC_PASSWORD_FILE"), Some("/etc/restic/password"));
    assert_eq!(call.env_value("RESTIC_COMPRESSION"), Some("max"));
}

#[test]
fn test_restic_dry_run_only_lists_snapshots() {
    let config = ConfigBuilder::restic("volumes").build();
    let executor = MockExecutor::new().expect("restic", MockResponse::ok("ID  Time\nabc  today"));

    let result = BackupManager::new(&executor).run(&config, true);

    assert_eq!(result.output, "ID  Time\nabc  today");
    let calls = executor.calls_to("restic");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].args, vec!["snapshots", "--latest", "1"]);
    assert!(!calls[0].tee);
}

#[test]
fn test_rclone_multi_source_stops_at_first_failure() {
    let config = ConfigBuilder::rclone("media")
        .sources(&["/srv/photos", "/srv/videos", "/srv/music"])
        .build();
    let executor = MockExecutor::new()
        .expect("rclone", MockResponse::ok("photos synced"))
        .expect("rclone", MockResponse::fail(3, "directory not found"));

    let result = BackupManager::new(&executor).run(&config, false);

    let calls = executor.calls_to("rclone");
    assert_eq!(calls.len(), 2);
    assert!(calls[0].args.ends_with(&["/srv/photos".to_string(), "gdrive:backups/photos".to_string()]));
    assert!(calls[1].args.ends_with(&["/srv/videos".to_string(), "gdrive:backups/videos".to_string()]));

    assert!(result.output.contains("photos synced"));
    assert!(result.output.contains("directory not found"));
    match result.error {
        Some(BackupError::Transfer { ref context, .. }) => assert!(context.contains("/srv/videos")),
        ref other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_rclone_single_source_targets_remote_root() {
    let config = ConfigBuilder::rclone("photos").build();
    let executor = MockExecutor::new();

    BackupManager::new(&executor).run(&config, false).into_result().unwrap();

    let call = &executor.calls_to("rclone")[0];
    assert!(call.tee);
    assert!(call.args.ends_with(&["/srv/data".to_string(), "gdrive:backups".to_string()]));
}

#[test]
fn test_hook_order() {
    let config = ConfigBuilder::rsync("docs")
        .hooks(Hooks {
            pre_backup: Some("echo pre".to_string()),
            post_backup: Some("echo post".to_string()),
            on_failure: Some("echo failed".to_string()),
        })
        .build();
    let executor = MockExecutor::new();

    BackupManager::new(&executor).run(&config, false).into_result().unwrap();

    let programs: Vec<String> = executor
        .get_calls()
        .into_iter()
        .map(|c| c.args.last().cloned().unwrap_or(c.program))
        .collect();
    assert_eq!(programs, vec!["echo pre", "/mnt/backup", "echo post"]);
}

#[test]
fn test_transfer_failure_runs_on_failure_hook() {
    let config = ConfigBuilder::rsync("docs")
        .hooks(Hooks {
            post_backup: Some("echo post".to_string()),
            on_failure: Some("echo failed".to_string()),
            ..Default::default()
        })
        .build();
    let executor = MockExecutor::new().expect("rsync", MockResponse::fail(12, "protocol error"));

    let result = BackupManager::new(&executor).run(&config, false);

    assert!(matches!(result.error, Some(BackupError::Transfer { .. })));
    let hooks = executor.calls_to("sh");
    assert_eq!(hooks.len(), 1);
    assert_eq!(hooks[0].args[1], "echo failed");
}

#[test]
fn test_pre_hook_failure_reports_stage() {
    let config = ConfigBuilder::rclone("photos")
        .hooks(Hooks {
            pre_backup: Some("exit 3".to_string()),
            ..Default::default()
        })
        .build();
    let executor = MockExecutor::new().expect("sh", MockResponse::fail(3, ""));

    let err = BackupManager::new(&executor)
        .run(&config, false)
        .into_result()
        .unwrap_err();

    assert!(matches!(err, BackupError::Hook { stage: HookStage::PreBackup, .. }));
    assert!(!executor.was_called("rclone"));
}

#[test]
fn test_missing_tool_has_install_guidance() {
    let config = ConfigBuilder::restic("volumes").build();
    let executor = MockExecutor::new().without_program("restic");

    let err = BackupManager::new(&executor)
        .run(&config, false)
        .into_result()
        .unwrap_err();

    assert!(err.to_string().contains("restic is not installed"));
    assert!(err.to_string().contains("restic.net"));
}
