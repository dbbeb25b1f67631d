//! Command execution abstraction for testability
//!
//! The engines never spawn processes directly. They go through a
//! [`CommandExecutor`], so tests can script tool responses with
//! [`mock::MockExecutor`] instead of needing rsync, restic or rclone installed.

use super::command::{CommandOutput, CommandSpec};
use crate::error::Result;
use std::path::PathBuf;

/// Abstraction for command execution, enabling mocking in tests
pub trait CommandExecutor: Send + Sync {
    /// Run a command to completion
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Locate a program on the search path
    fn find_program(&self, program: &str) -> Option<PathBuf>;
}

/// Default implementation using real subprocess calls
#[derive(Debug, Clone, Default)]
pub struct RealExecutor;

impl RealExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for RealExecutor {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        super::command::run_command(spec)
    }

    fn find_program(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

/// A mock executor for testing that records calls and returns configured responses
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use crate::error::BackupError;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::sync::{Arc, Mutex};

    /// Recorded command invocation
    #[derive(Clone, Debug)]
    pub struct CommandCall {
        pub program: String,
        pub args: Vec<String>,
        pub env: Vec<(String, String)>,
        pub tee: bool,
    }

    impl CommandCall {
        pub fn has_arg(&self, arg: &str) -> bool {
            self.args.iter().any(|a| a == arg)
        }

        pub fn env_value(&self, key: &str) -> Option<&str> {
            self.env
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        }
    }

    /// Response configuration for mock
    #[derive(Clone, Debug)]
    pub enum MockResponse {
        Success { stdout: String, stderr: String },
        Failure { stderr: String, exit_code: i32 },
        /// The program could not be started at all
        SpawnError,
    }

    impl MockResponse {
        pub fn ok(stdout: impl Into<String>) -> Self {
            MockResponse::Success {
                stdout: stdout.into(),
                stderr: String::new(),
            }
        }

        pub fn fail(exit_code: i32, stderr: impl Into<String>) -> Self {
            MockResponse::Failure {
                stderr: stderr.into(),
                exit_code,
            }
        }
    }

    impl Default for MockResponse {
        fn default() -> Self {
            MockResponse::ok("")
        }
    }

    /// Mock executor for testing
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        /// Recorded command invocations
        pub calls: Arc<Mutex<Vec<CommandCall>>>,
        /// Queued responses per program, consumed in order
        responses: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
        /// Default response when a program's queue is empty
        default_response: Arc<Mutex<MockResponse>>,
        /// Programs that `find_program` reports as absent
        missing: Arc<Mutex<HashSet<String>>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response for the next call to `program`
        pub fn expect(self, program: &str, response: MockResponse) -> Self {
            self.responses
                .lock()
                .unwrap()
                .entry(program.to_string())
                .or_default()
                .push_back(response);
            self
        }

        /// Set the default response for unconfigured programs
        pub fn with_default_response(self, response: MockResponse) -> Self {
            *self.default_response.lock().unwrap() = response;
            self
        }

        /// Pretend `program` is not installed
        pub fn without_program(self, program: &str) -> Self {
            self.missing.lock().unwrap().insert(program.to_string());
            self
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<CommandCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Recorded calls to one program
        pub fn calls_to(&self, program: &str) -> Vec<CommandCall> {
            self.get_calls()
                .into_iter()
                .filter(|c| c.program == program)
                .collect()
        }

        /// Check if a program was called
        pub fn was_called(&self, program: &str) -> bool {
            self.call_count(program) > 0
        }

        /// Get number of calls to a specific program
        pub fn call_count(&self, program: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.program == program)
                .count()
        }

        fn next_response(&self, program: &str) -> MockResponse {
            self.responses
                .lock()
                .unwrap()
                .get_mut(program)
                .and_then(|queue| queue.pop_front())
                .unwrap_or_else(|| self.default_response.lock().unwrap().clone())
        }
    }

    impl CommandExecutor for MockExecutor {
        fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
            self.calls.lock().unwrap().push(CommandCall {
                program: spec.program.clone(),
                args: spec.args.clone(),
                env: spec.env.clone(),
                tee: spec.tee,
            });

            match self.next_response(&spec.program) {
                MockResponse::Success { stdout, stderr } => Ok(CommandOutput {
                    code: Some(0),
                    stdout,
                    stderr,
                }),
                MockResponse::Failure { stderr, exit_code } => Ok(CommandOutput {
                    code: Some(exit_code),
                    stdout: String::new(),
                    stderr,
                }),
                MockResponse::SpawnError => Err(BackupError::Exec {
                    program: spec.program.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
                }),
            }
        }

        fn find_program(&self, program: &str) -> Option<PathBuf> {
            if self.missing.lock().unwrap().contains(program) {
                None
            } else {
                Some(PathBuf::from("/usr/bin").join(program))
            }
        }
    }
}
