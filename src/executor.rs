//! Running submitted source code through a language toolchain.

use crate::artifact::ArtifactDir;
use crate::error::{ErrorKind, ExecError};
use crate::process::{self, StepOutput};
use crate::toolchain::{self, Placeholders, ToolchainTable, JAVA_ENTRY_CLASS};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_COMPILE_TIMEOUT: Duration = Duration::from_secs(15);

/// Outcome of one execution. Always produced, whatever went wrong.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub succeeded: bool,
    pub exit_code: Option<i32>,
    pub error: Option<ErrorKind>,
    /// Human readable description of `error`.
    pub message: Option<String>,
}

impl ExecutionResult {
    fn from_error(err: &ExecError) -> Self {
        let (stderr, exit_code) = match err {
            ExecError::CompilationError { stderr, exit_code }
            | ExecError::RuntimeFailure { stderr, exit_code, .. } => (stderr.clone(), *exit_code),
            _ => (String::new(), None),
        };
        Self {
            stdout: String::new(),
            stderr,
            succeeded: false,
            exit_code,
            error: Some(err.kind()),
            message: Some(err.message()),
        }
    }
}

/// Runs one unit of submitted code per call. Holds no per-request state, so
/// a single instance is shared by all concurrent requests.
#[derive(Debug, Clone)]
pub struct Executor {
    toolchains: ToolchainTable,
    temp_root: PathBuf,
    run_timeout: Duration,
    compile_timeout: Duration,
}

impl Executor {
    pub fn new(toolchains: ToolchainTable, temp_root: PathBuf) -> Self {
        Self {
            toolchains,
            temp_root,
            run_timeout: DEFAULT_RUN_TIMEOUT,
            compile_timeout: DEFAULT_COMPILE_TIMEOUT,
        }
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }

    pub fn with_compile_timeout(mut self, timeout: Duration) -> Self {
        self.compile_timeout = timeout;
        self
    }

    pub fn toolchains(&self) -> &ToolchainTable {
        &self.toolchains
    }

    /// Execute `code` as `language`.
    ///
    /// Java code must declare `public class Main`; the class name is not
    /// checked here.
    pub async fn execute(&self, code: &str, language: &str) -> ExecutionResult {
        let started = Instant::now();
        let result = match self.try_execute(code, language).await {
            Ok(output) => {
                let succeeded = output.success();
                ExecutionResult {
                    error: (!succeeded).then_some(ErrorKind::RuntimeFailure),
                    message: (!succeeded).then(|| {
                        ExecError::RuntimeFailure {
                            stderr: output.stderr.clone(),
                            exit_code: output.exit_code,
                            signal: output.signal,
                        }
                        .message()
                    }),
                    stdout: output.stdout,
                    stderr: output.stderr,
                    succeeded,
                    exit_code: output.exit_code,
                }
            }
            Err(err) => ExecutionResult::from_error(&err),
        };
        info!(
            language,
            succeeded = result.succeeded,
            exit_code = ?result.exit_code,
            error = ?result.error,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Execution finished"
        );
        result
    }

    /// The fallible core. The artifact guard lives for the whole call, so the
    /// scratch directory is removed whichever `?` returns early.
    async fn try_execute(&self, code: &str, language: &str) -> Result<StepOutput, ExecError> {
        if code.trim().is_empty() {
            return Err(ExecError::InvalidInput("No code provided"));
        }
        let (name, toolchain) = self
            .toolchains
            .resolve(language)
            .ok_or_else(|| ExecError::UnsupportedLanguage(language.to_string()))?;

        let artifacts = ArtifactDir::create(&self.temp_root)?;
        let source = artifacts.write_source(&toolchain.source_file_name(), code)?;
        let binary = artifacts.binary_path();
        let vars = Placeholders {
            source: &source,
            dir: artifacts.path(),
            binary: &binary,
            entry: JAVA_ENTRY_CLASS,
        };
        info!(language = name, dir = ?artifacts.path(), "Executing submission");

        if let Some(compile) = &toolchain.compile {
            let argv = toolchain::expand(compile, &vars);
            let compiled =
                process::run_step(&argv, Some(artifacts.path()), self.compile_timeout).await?;
            if !compiled.success() {
                return Err(ExecError::CompilationError {
                    stderr: compiled.stderr,
                    exit_code: compiled.exit_code,
                });
            }
        }

        let argv = toolchain::expand(&toolchain.run, &vars);
        process::run_step(&argv, Some(artifacts.path()), self.run_timeout).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh_table() -> ToolchainTable {
        ToolchainTable::from_toml_str(
            r#"
            [languages.shell]
            extension = "sh"
            run = ["sh", "{source}"]

            [languages.fakec]
            extension = "fc"
            compile = ["sh", "-c", "cat {source} > {binary}; chmod +x {binary}; grep -q BROKEN {source} && echo 'fakec: syntax error' >&2 && exit 1; exit 0"]
            run = ["{binary}"]

            [languages.slowc]
            extension = "sc"
            compile = ["sh", "-c", "echo compiling; sleep 30"]
            run = ["{binary}"]

            [languages.ghost]
            extension = "g"
            run = ["ghost-interpreter-9c1e", "{source}"]
            "#,
        )
        .unwrap()
    }

    fn executor(root: &std::path::Path) -> Executor {
        Executor::new(sh_table(), root.to_path_buf())
    }

    #[tokio::test]
    async fn empty_code_is_invalid_input() {
        let root = tempfile::tempdir().unwrap();
        let result = executor(root.path()).execute("   \n", "shell").await;
        assert!(!result.succeeded);
        assert_eq!(result.error, Some(ErrorKind::InvalidInput));
        assert_eq!(std::fs::read_dir(root.path()).map(|d| d.count()).unwrap_or(0), 0);
    }

    #[tokio::test]
    async fn unknown_language_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let result = executor(root.path()).execute("puts 1", "ruby").await;
        assert_eq!(result.error, Some(ErrorKind::UnsupportedLanguage));
        assert_eq!(result.message.as_deref(), Some("Unsupported language: ruby"));
    }

    #[tokio::test]
    async fn interpreted_success_and_cleanup() {
        let root = tempfile::tempdir().unwrap();
        let result = executor(root.path()).execute("echo ok", "shell").await;
        assert!(result.succeeded);
        assert_eq!(result.stdout, "ok\n");
        assert_eq!(result.stderr, "");
        assert_eq!(result.exit_code, Some(0));
        assert!(result.error.is_none());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn runtime_failure_keeps_output() {
        let root = tempfile::tempdir().unwrap();
        let result = executor(root.path())
            .execute("echo before; echo boom >&2; exit 4", "shell")
            .await;
        assert!(!result.succeeded);
        assert_eq!(result.stdout, "before\n");
        assert_eq!(result.exit_code, Some(4));
        assert_eq!(result.error, Some(ErrorKind::RuntimeFailure));
        assert_eq!(result.message.as_deref(), Some("boom\n"));
    }

    #[tokio::test]
    async fn compile_then_run_uses_run_output() {
        let root = tempfile::tempdir().unwrap();
        let code = "#!/bin/sh\necho compiled-ok\n";
        let result = executor(root.path()).execute(code, "fakec").await;
        assert!(result.succeeded, "{:?}", result);
        assert_eq!(result.stdout, "compiled-ok\n");
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn compile_step_has_its_own_bound() {
        let root = tempfile::tempdir().unwrap();
        let exec = executor(root.path())
            .with_compile_timeout(Duration::from_secs(1))
            .with_run_timeout(Duration::from_secs(30));
        let start = Instant::now();
        let result = exec.execute("int main() {}", "slowc").await;
        assert!(start.elapsed() < Duration::from_secs(3));
        assert_eq!(result.error, Some(ErrorKind::Timeout));
        assert_eq!(result.message.as_deref(), Some("Execution timed out after 1 seconds"));
        assert_eq!(result.stdout, "");
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn signalled_program_names_the_signal() {
        let root = tempfile::tempdir().unwrap();
        let result = executor(root.path()).execute("kill -SEGV $$", "shell").await;
        assert!(!result.succeeded);
        assert_eq!(result.exit_code, None);
        assert_eq!(result.error, Some(ErrorKind::RuntimeFailure));
        assert_eq!(result.message.as_deref(), Some("Process terminated by signal 11"));
    }

    #[tokio::test]
    async fn compile_failure_reports_compiler_stderr() {
        let root = tempfile::tempdir().unwrap();
        let code = "#!/bin/sh\n# BROKEN\necho never\n";
        let result = executor(root.path()).execute(code, "fakec").await;
        assert!(!result.succeeded);
        assert_eq!(result.error, Some(ErrorKind::CompilationError));
        assert_eq!(result.stdout, "");
        assert!(result.stderr.contains("fakec: syntax error"));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn missing_interpreter_is_reported() {
        let root = tempfile::tempdir().unwrap();
        let result = executor(root.path()).execute("anything", "ghost").await;
        assert_eq!(result.error, Some(ErrorKind::ToolchainNotFound));
        assert!(result.message.unwrap().contains("ghost-interpreter-9c1e"));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn timeout_discards_output_and_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let exec = executor(root.path()).with_run_timeout(Duration::from_secs(1));
        let start = Instant::now();
        let result = exec.execute("echo partial; sleep 30", "shell").await;
        assert!(start.elapsed() < Duration::from_secs(3));
        assert_eq!(result.error, Some(ErrorKind::Timeout));
        assert_eq!(result.stdout, "");
        assert_eq!(result.exit_code, None);
        assert_eq!(result.message.as_deref(), Some("Execution timed out after 1 seconds"));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn concurrent_executions_do_not_interfere() {
        let root = tempfile::tempdir().unwrap();
        let exec = executor(root.path());
        let (a, b) = tokio::join!(
            exec.execute("sleep 0.2; echo first", "shell"),
            exec.execute("echo second", "shell"),
        );
        assert_eq!(a.stdout, "first\n");
        assert_eq!(b.stdout, "second\n");
    }
}
