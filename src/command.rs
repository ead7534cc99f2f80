//! Shell command execution for the developer terminal.
//!
//! Commands are screened against a fixed list of dangerous substrings before
//! they reach the shell. The screen is a blunt textual filter: it deters
//! obvious mistakes and is trivially bypassed by equivalent commands that do
//! not match the list. It is not a security boundary.

use crate::error::{ErrorKind, ExecError};
use crate::process;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Substrings that block a command line, matched case-insensitively.
pub const DENY_LIST: &[&str] = &[
    "rm -rf",
    "rm -fr",
    "sudo rm",
    "mkfs",
    "dd if=",
    "> /dev/sd",
    "shutdown",
    "reboot",
    "halt",
    "poweroff",
    "init 0",
    "init 6",
    "format c:",
    "del /f",
    "rmdir /s",
    ":(){ :|:& };:",
];

/// Verdict of the deny-list screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screening {
    Allowed,
    Blocked { pattern: &'static str },
}

pub fn screen(command_line: &str) -> Screening {
    let lowered = command_line.to_lowercase();
    DENY_LIST
        .iter()
        .copied()
        .find(|pattern| lowered.contains(pattern))
        .map_or(Screening::Allowed, |pattern| Screening::Blocked { pattern })
}

/// Outcome of one command line.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    pub combined_output: String,
    pub succeeded: bool,
    /// `-1` when the command never produced an exit code.
    pub exit_code: i32,
    pub error: Option<ErrorKind>,
    pub message: Option<String>,
}

impl CommandResult {
    fn from_error(err: &ExecError) -> Self {
        Self {
            combined_output: String::new(),
            succeeded: false,
            exit_code: -1,
            error: Some(err.kind()),
            message: Some(err.message()),
        }
    }
}

/// stdout, then stderr, newline-joined only when both are non-empty.
pub fn combine_output(stdout: &str, stderr: &str) -> String {
    match (stdout.is_empty(), stderr.is_empty()) {
        (false, false) => format!("{}\n{}", stdout, stderr),
        (false, true) => stdout.to_string(),
        (true, _) => stderr.to_string(),
    }
}

/// Runs command lines through `sh -c` inside the application root.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    working_dir: PathBuf,
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(working_dir: PathBuf) -> Self {
        Self { working_dir, timeout: DEFAULT_COMMAND_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn run(&self, command_line: &str) -> CommandResult {
        match self.try_run(command_line).await {
            Ok(result) => result,
            Err(err) => {
                info!(error = %err, "Command rejected or failed");
                CommandResult::from_error(&err)
            }
        }
    }

    async fn try_run(&self, command_line: &str) -> Result<CommandResult, ExecError> {
        if command_line.trim().is_empty() {
            return Err(ExecError::InvalidInput("No command provided"));
        }
        if let Screening::Blocked { pattern } = screen(command_line) {
            warn!(command = %command_line, pattern, "Command blocked by deny-list");
            return Err(ExecError::CommandBlocked { pattern: pattern.to_string() });
        }

        info!(command = %command_line, cwd = ?self.working_dir, "Running command");
        let argv = vec!["sh".to_string(), "-c".to_string(), command_line.to_string()];
        let output = process::run_step(&argv, Some(&self.working_dir), self.timeout).await?;

        let exit_code = output.exit_code.unwrap_or(-1);
        let succeeded = exit_code == 0;
        Ok(CommandResult {
            combined_output: combine_output(&output.stdout, &output.stderr),
            succeeded,
            exit_code,
            error: (!succeeded).then_some(ErrorKind::RuntimeFailure),
            message: (!succeeded).then(|| {
                ExecError::RuntimeFailure {
                    stderr: output.stderr.clone(),
                    exit_code: output.exit_code,
                    signal: output.signal,
                }
                .message()
            }),
        })
    }
}
