//! Test utilities for quadlet-backup
//!
//! This crate provides shared builders, a temporary configuration root and
//! sample configuration files for testing quadlet-backup.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, MockExecutor, TestContext};
//!
//! #[test]
//! fn my_test() {
//!     let ctx = TestContext::with_configs(&[ConfigBuilder::rsync("docs").build()]);
//!     let executor = MockExecutor::new();
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use test_context::{ResultAssertions, TestContext};

// Re-export types from the main crate for convenience
pub use quadlet_backup::config::{
    BackupConfig, BackupType, ConfigStore, EmailSettings, Engine, Hooks, Retention, Settings,
    VerifyMethod,
};
pub use quadlet_backup::error::{BackupError, HookStage};

// Re-export mock implementations from the main crate
pub use quadlet_backup::utils::executor::mock::{CommandCall, MockExecutor, MockResponse};
pub use quadlet_backup::utils::executor::CommandExecutor;
pub use quadlet_backup::utils::mail::mock::MockTransport;
