//! Error kinds shared by the executor and the command runner.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Everything that can go wrong while running submitted code or a command.
///
/// None of these escape to the HTTP layer as faults; they are folded into
/// `ExecutionResult` / `CommandResult` at the component boundary.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Compilation failed")]
    CompilationError { stderr: String, exit_code: Option<i32> },

    #[error("Toolchain not found: `{binary}` is not installed or not on PATH")]
    ToolchainNotFound { binary: String },

    #[error("Execution timed out after {} seconds", limit.as_secs())]
    Timeout { limit: Duration },

    #[error("{}", exit_summary(*exit_code, *signal))]
    RuntimeFailure { stderr: String, exit_code: Option<i32>, signal: Option<i32> },

    #[error("Command blocked: contains `{pattern}`")]
    CommandBlocked { pattern: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_summary(exit_code: Option<i32>, signal: Option<i32>) -> String {
    match (exit_code, signal) {
        (Some(code), _) => format!("Process exited with code {}", code),
        (None, Some(signal)) => format!("Process terminated by signal {}", signal),
        (None, None) => "Process exited abnormally".to_string(),
    }
}

/// Fieldless mirror of [`ExecError`] carried in results and on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    UnsupportedLanguage,
    CompilationError,
    ToolchainNotFound,
    Timeout,
    RuntimeFailure,
    CommandBlocked,
    Internal,
}

impl ExecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::InvalidInput(_) => ErrorKind::InvalidInput,
            ExecError::UnsupportedLanguage(_) => ErrorKind::UnsupportedLanguage,
            ExecError::CompilationError { .. } => ErrorKind::CompilationError,
            ExecError::ToolchainNotFound { .. } => ErrorKind::ToolchainNotFound,
            ExecError::Timeout { .. } => ErrorKind::Timeout,
            ExecError::RuntimeFailure { .. } => ErrorKind::RuntimeFailure,
            ExecError::CommandBlocked { .. } => ErrorKind::CommandBlocked,
            ExecError::Io(_) => ErrorKind::Internal,
        }
    }

    /// Message surfaced to callers. Compiler and runtime failures surface the
    /// diagnostic text itself, falling back to the summary when it is empty.
    pub fn message(&self) -> String {
        match self {
            ExecError::CompilationError { stderr, .. } | ExecError::RuntimeFailure { stderr, .. }
                if !stderr.trim().is_empty() =>
            {
                stderr.clone()
            }
            other => other.to_string(),
        }
    }
}
