//! Spawning a single toolchain step under a wall-clock bound.

use crate::error::ExecError;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::AbortHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

/// Captured output of a step that ran to completion.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
}

impl StepOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Run `argv` and wait for it (and its output pipes) for at most `limit`.
///
/// The child gets its own process group. On timeout the whole group is
/// killed, the child is reaped, and any partial output is discarded.
/// A missing program maps to [`ExecError::ToolchainNotFound`].
pub async fn run_step(
    argv: &[String],
    cwd: Option<&Path>,
    limit: Duration,
) -> Result<StepOutput, ExecError> {
    let (program, args) = argv
        .split_first()
        .ok_or(ExecError::InvalidInput("Empty command"))?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    #[cfg(unix)]
    cmd.process_group(0);

    let deadline = Instant::now() + limit;
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(binary = %program, "Toolchain binary not found");
            return Err(ExecError::ToolchainNotFound { binary: program.clone() });
        }
        Err(e) => return Err(e.into()),
    };
    let pid = child.id();
    debug!(pid = ?pid, command = ?argv, "Step spawned");

    let stdout_task = tokio::spawn(read_pipe(child.stdout.take(), "stdout"));
    let stderr_task = tokio::spawn(read_pipe(child.stderr.take(), "stderr"));
    let mut guard = StepGuard {
        pid,
        readers: [stdout_task.abort_handle(), stderr_task.abort_handle()],
        armed: true,
    };

    let waited = timeout_at(deadline, async {
        let status = child.wait().await?;
        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();
        Ok::<_, io::Error>((status, stdout, stderr))
    })
    .await;

    match waited {
        Ok(Ok((status, stdout, stderr))) => {
            guard.disarm();
            let exit_code = status.code();
            let signal = exit_signal(&status);
            debug!(pid = ?pid, exit_code = ?exit_code, signal = ?signal, "Step exited");
            Ok(StepOutput {
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                exit_code,
                signal,
            })
        }
        Ok(Err(e)) => Err(e.into()),
        Err(_) => {
            info!(pid = ?pid, limit_secs = limit.as_secs(), "Step timed out, killing process group");
            kill_group(pid);
            // Errors if the child already exited and only its pipes were
            // still held open by descendants.
            if let Err(e) = child.kill().await {
                debug!(pid = ?pid, error = %e, "Kill after timeout");
            }
            guard.disarm();
            Err(ExecError::Timeout { limit })
        }
    }
}

/// Kills the step's process group and stops its pipe readers unless the
/// child was reaped first. Covers the caller dropping `run_step` mid-wait,
/// where `kill_on_drop` alone only reaches the direct child.
struct StepGuard {
    pid: Option<u32>,
    readers: [AbortHandle; 2],
    armed: bool,
}

impl StepGuard {
    /// Once the group leader is reaped its pid may be reused, so the group
    /// must not be signalled again.
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for StepGuard {
    fn drop(&mut self) {
        if self.armed {
            debug!(pid = ?self.pid, "Step dropped before completion, killing process group");
            kill_group(self.pid);
        }
        for reader in &self.readers {
            reader.abort();
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>, name: &'static str) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            debug!(pipe = name, read = buf.len(), error = %e, "Pipe read failed, output truncated");
        }
    }
    buf
}

#[cfg(target_os = "linux")]
fn kill_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = pid {
        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            debug!(pid, error = %e, "killpg failed");
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn kill_group(_pid: Option<u32>) {}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}
