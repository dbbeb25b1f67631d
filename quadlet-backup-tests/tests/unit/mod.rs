//! Unit tests for quadlet-backup
//!
//! Pure logic and file-format tests that need neither external tools nor
//! the network.

mod config;
mod notifier;
mod schedule;
mod settings;
