//! Unit tests for process-wide settings

use quadlet_backup::config::{EmailOverrides, Settings};
use serial_test::serial;
use std::path::PathBuf;
use test_utils::{settings_toml, TestContext};

#[test]
fn test_settings_fixture() {
    let ctx = TestContext::new();
    let settings = ctx.settings(settings_toml());

    assert_eq!(settings.email.host, "mail.example.com");
    assert_eq!(settings.email.port, 25);
    assert!(!settings.email.tls);
    assert_eq!(settings.logging.max_files, 3);
    assert_eq!(settings.lock_directory(), PathBuf::from("/run/user/1000/qh-locks"));
}

#[test]
fn test_overrides_beat_file_values() {
    let ctx = TestContext::new();
    let mut settings = ctx.settings(settings_toml());

    EmailOverrides {
        port: Some(587),
        tls: Some(true),
        to: Some("oncall@example.com".to_string()),
        ..Default::default()
    }
    .apply(&mut settings.email);

    assert_eq!(settings.email.host, "mail.example.com");
    assert_eq!(settings.email.port, 587);
    assert!(settings.email.tls);
    assert_eq!(settings.email.to, "oncall@example.com");
    assert_eq!(settings.email.from, "qh@example.com");
}

#[test]
fn test_tilde_paths_are_expanded() {
    let ctx = TestContext::new();
    let settings = ctx.settings("lock_directory = \"~/locks\"\n[logging]\ndirectory = \"~/qh-logs\"\n");

    assert!(!settings.lock_directory().starts_with("~"));
    assert!(settings.lock_directory().ends_with("locks"));
    assert!(settings.log_directory().ends_with("qh-logs"));
}

#[test]
#[serial]
fn test_default_lock_directory_uses_runtime_dir() {
    let ctx = TestContext::new();
    let previous = std::env::var_os("XDG_RUNTIME_DIR");
    std::env::set_var("XDG_RUNTIME_DIR", ctx.temp_dir());

    let lock_dir = Settings::default().lock_directory();

    match previous {
        Some(value) => std::env::set_var("XDG_RUNTIME_DIR", value),
        None => std::env::remove_var("XDG_RUNTIME_DIR"),
    }
    assert_eq!(lock_dir, ctx.temp_dir().join("quadlet-helper"));
}

#[test]
#[serial]
fn test_default_log_directory_uses_state_dir() {
    let ctx = TestContext::new();
    let previous = std::env::var_os("XDG_STATE_HOME");
    std::env::set_var("XDG_STATE_HOME", ctx.temp_dir());

    let log_dir = Settings::default().log_directory();

    match previous {
        Some(value) => std::env::set_var("XDG_STATE_HOME", value),
        None => std::env::remove_var("XDG_STATE_HOME"),
    }
    assert_eq!(log_dir, ctx.temp_dir().join("quadlet-helper").join("logs"));
}
