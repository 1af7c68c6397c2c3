//! Bounded execution of analysis tools.
//!
//! One call spawns exactly one process, passes the target as a plain argument
//! (never through a shell), buffers stdout/stderr, and kills the process if it
//! outlives the tool's timeout.

use super::ToolSpec;
use crate::types::{AnalysisTarget, TaskOutcome};
use async_trait::async_trait;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Runs a tool against a target and reports how it ended.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, tool: &ToolSpec, target: &AnalysisTarget) -> TaskOutcome;
}

/// Invoker backed by real OS processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessInvoker;

#[async_trait]
impl ToolInvoker for ProcessInvoker {
    async fn invoke(&self, tool: &ToolSpec, target: &AnalysisTarget) -> TaskOutcome {
        run_tool(tool, target).await
    }
}

/// Run `tool` against `target` to completion or until its timeout expires.
pub async fn run_tool(tool: &ToolSpec, target: &AnalysisTarget) -> TaskOutcome {
    let program = tool.program_name();
    let args = tool.build_args(target);

    let mut command = Command::new(&tool.executable);
    command
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Own process group, so a timeout can take down helpers the tool started
    #[cfg(unix)]
    command.process_group(0);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(program = %program, error = %e, "Failed to launch tool");
            return TaskOutcome::launch_failed(format!("Failed to launch {}: {}", program, e));
        }
    };

    let pid = child.id();
    let started = Instant::now();
    debug!(
        program = %program,
        pid = ?pid,
        timeout_ms = millis(tool.timeout),
        "Tool started"
    );

    let result = tokio::time::timeout(tool.timeout, collect_output(&mut child)).await;

    match result {
        Ok(Ok((status, stdout, stderr))) => {
            info!(
                program = %program,
                exit_code = ?status.code(),
                elapsed_ms = millis(started.elapsed()),
                "Tool finished"
            );
            TaskOutcome::Success {
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                exit_code: status.code(),
            }
        }
        Ok(Err(e)) => {
            warn!(program = %program, error = %e, "Lost contact with tool process");
            terminate(&mut child, pid).await;
            TaskOutcome::launch_failed(format!("Error running {}: {}", program, e))
        }
        Err(_) => {
            warn!(
                program = %program,
                timeout_ms = millis(tool.timeout),
                "Tool timed out, killing it"
            );
            terminate(&mut child, pid).await;
            TaskOutcome::TimedOut
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Wait for exit while draining both pipes, so a chatty tool never blocks on a full pipe.
async fn collect_output(child: &mut Child) -> io::Result<(ExitStatus, Vec<u8>, Vec<u8>)> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (stdout, stderr, status) =
        tokio::try_join!(read_all(stdout), read_all(stderr), child.wait())?;

    Ok((status, stdout, stderr))
}

async fn read_all<R: AsyncRead + Unpin>(reader: Option<R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Kill the tool (and its process group on Unix) and reap it.
async fn terminate(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pid {
        // SAFETY: plain syscall; the group was created by `process_group(0)` at spawn
        let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
        if rc != 0 {
            debug!(pid, error = %io::Error::last_os_error(), "killpg failed");
        }
    }
    #[cfg(not(unix))]
    let _ = pid;

    if let Err(e) = child.start_kill() {
        debug!(error = %e, "Tool already gone");
    }
    if let Err(e) = child.wait().await {
        debug!(error = %e, "Failed to reap tool process");
    }
}
