//! Utilities for running external tools and capturing their output

use crate::error::{BackupError, Result};
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{debug, error};

/// A fully described subprocess invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Added on top of the inherited process environment
    pub env: Vec<(String, String)>,
    /// Echo output to the terminal while capturing it
    pub tee: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// `sh -c <script>`, used for hooks
    pub fn shell(script: &str) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn envs(mut self, pairs: &[(String, String)]) -> Self {
        self.env.extend(pairs.iter().cloned());
        self
    }

    pub fn tee(mut self, tee: bool) -> Self {
        self.tee = tee;
        self
    }

    /// Command line for logs and error messages
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Result of a finished subprocess
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Human readable exit status
    pub fn status(&self) -> String {
        match self.code {
            Some(code) => format!("exit status: {}", code),
            None => "terminated by signal".to_string(),
        }
    }

    /// stdout followed by stderr
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => {
                let mut out = self.stdout.clone();
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&self.stderr);
                out
            }
        }
    }
}

/// Run a command to completion. Only a failure to spawn is an error; a
/// non-zero exit is reported through [`CommandOutput::code`].
pub fn run_command(spec: &CommandSpec) -> Result<CommandOutput> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args);
    cmd.envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    debug!("Running command: {}", spec.display());

    let exec_err = |source| BackupError::Exec {
        program: spec.program.clone(),
        source,
    };

    let output = if spec.tee {
        run_tee(cmd).map_err(exec_err)?
    } else {
        let output = cmd.output().map_err(exec_err)?;
        CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    };

    if output.success() {
        if !output.stdout.is_empty() && !spec.tee {
            debug!("Command output: {}", output.stdout.trim_end());
        }
    } else {
        error!("Command failed: {} ({})", spec.display(), output.status());
        if !output.stderr.is_empty() {
            error!("Stderr: {}", output.stderr.trim_end());
        }
    }

    Ok(output)
}

/// Stream both pipes to the terminal line by line while keeping a copy
fn run_tee(mut cmd: Command) -> std::io::Result<CommandOutput> {
    let mut child = cmd.spawn()?;

    let stdout_buf = Arc::new(Mutex::new(String::new()));
    let stderr_buf = Arc::new(Mutex::new(String::new()));

    let stdout_thread = child
        .stdout
        .take()
        .map(|pipe| spawn_tee(pipe, Arc::clone(&stdout_buf), false));
    let stderr_thread = child
        .stderr
        .take()
        .map(|pipe| spawn_tee(pipe, Arc::clone(&stderr_buf), true));

    let status = child.wait()?;

    for handle in [stdout_thread, stderr_thread].into_iter().flatten() {
        let _ = handle.join();
    }

    let take = |buf: &Arc<Mutex<String>>| {
        buf.lock()
            .map(|mut s| std::mem::take(&mut *s))
            .unwrap_or_default()
    };

    Ok(CommandOutput {
        code: status.code(),
        stdout: take(&stdout_buf),
        stderr: take(&stderr_buf),
    })
}

fn spawn_tee<R: Read + Send + 'static>(
    pipe: R,
    buffer: Arc<Mutex<String>>,
    to_stderr: bool,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&line);
                    if to_stderr {
                        let _ = std::io::stderr().write_all(text.as_bytes());
                    } else {
                        let mut out = std::io::stdout();
                        let _ = out.write_all(text.as_bytes());
                        let _ = out.flush();
                    }
                    if let Ok(mut buf) = buffer.lock() {
                        buf.push_str(&text);
                    }
                }
            }
        }
    })
}
