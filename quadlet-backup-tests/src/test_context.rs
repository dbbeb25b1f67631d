//! Test context and harness for integration testing
//!
//! Provides a temporary configuration root with a [`ConfigStore`] on top.

use anyhow::Result;
use quadlet_backup::config::{BackupConfig, ConfigStore, Settings};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test context that manages test resources and provides common utilities
pub struct TestContext {
    /// Temporary directory used as the configuration root
    temp_dir: TempDir,
    store: ConfigStore,
}

impl TestContext {
    /// Create a new test context with an empty configuration root
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = ConfigStore::new(temp_dir.path());
        Self { temp_dir, store }
    }

    /// Create a test context with `configs` already saved
    pub fn with_configs(configs: &[BackupConfig]) -> Self {
        let ctx = Self::new();
        for config in configs {
            ctx.save(config);
        }
        ctx
    }

    /// Get the temporary directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Save a configuration through the store
    pub fn save(&self, config: &BackupConfig) -> PathBuf {
        self.store.save(config).expect("Failed to save config")
    }

    /// Write a raw `backups/<name>.yaml`
    pub fn write_backup_yaml(&self, name: &str, yaml: &str) -> PathBuf {
        self.create_file(&format!("backups/{}.yaml", name), yaml)
    }

    /// Write `config.toml` and load it back
    pub fn settings(&self, toml: &str) -> Settings {
        let path = self.create_file("config.toml", toml);
        Settings::load(&path).expect("Failed to load settings")
    }

    /// Create a subdirectory in the temp dir
    pub fn create_subdir(&self, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::create_dir_all(&path).expect("Failed to create subdirectory");
        path
    }

    /// Create a file in the temp dir
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Read a file from the temp directory
    pub fn read_file(&self, name: &str) -> Result<String> {
        let path = self.temp_dir.path().join(name);
        Ok(std::fs::read_to_string(path)?)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension trait for assertion helpers
pub trait ResultAssertions<T> {
    /// Assert that the result is Ok and return the value
    fn assert_ok(self) -> T;

    /// Assert that the result is Err and its message contains the given string
    fn assert_err_contains(self, needle: &str);
}

impl<T: std::fmt::Debug, E: std::fmt::Display> ResultAssertions<T> for Result<T, E> {
    fn assert_ok(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {}", e),
        }
    }

    fn assert_err_contains(self, needle: &str) {
        match self {
            Ok(v) => panic!("Expected Err containing '{}', got Ok: {:?}", needle, v),
            Err(e) => {
                let err_msg = e.to_string();
                assert!(
                    err_msg.contains(needle),
                    "Error '{}' does not contain '{}'",
                    err_msg,
                    needle
                );
            }
        }
    }
}
