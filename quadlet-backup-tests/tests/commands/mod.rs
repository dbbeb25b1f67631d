//! Command tests for quadlet-backup
//!
//! These tests drive the run/verify/cleanup/install flows the CLI commands
//! use, with a mocked executor and mail transport.

mod cleanup;
mod install;
mod run;
mod verify;
