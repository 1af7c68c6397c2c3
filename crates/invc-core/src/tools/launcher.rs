//! Detached launching of auxiliary applications.
//!
//! Viewers, the text-mode browser, the file manager and desktop apps are
//! started and left running; their output is not captured and nothing waits
//! on them except a background reaper.

use super::{TARGET_PLACEHOLDER, ToolSpec};
use crate::error::{Error, Result};
use crate::types::AnalysisTarget;
use std::ffi::OsString;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Start `tool` detached, optionally against `target`. Returns the child's pid.
///
/// Without a target, template entries that are only `{target}` are dropped so
/// the application starts empty. Must be called inside a tokio runtime.
pub fn launch(tool: &ToolSpec, target: Option<&AnalysisTarget>) -> Result<u32> {
    let program = tool.program_name();
    let args: Vec<OsString> = match target {
        Some(target) => tool.build_args(target),
        None => tool
            .args
            .iter()
            .filter(|arg| arg.as_str() != TARGET_PLACEHOLDER)
            .map(OsString::from)
            .collect(),
    };

    let mut command = Command::new(&tool.executable);
    command
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    // Keep terminal signals aimed at the dashboard away from launched apps
    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn().map_err(|e| {
        warn!(program = %program, error = %e, "Failed to launch application");
        Error::launch_failed(&program, e.to_string())
    })?;

    let pid = child.id().unwrap_or_default();
    info!(program = %program, pid, "Launched application");

    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => debug!(program = %program, exit_code = ?status.code(), "Application exited"),
            Err(e) => debug!(program = %program, error = %e, "Failed to wait for application"),
        }
    });

    Ok(pid)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_launch_returns_pid() {
        let tool = ToolSpec::new("/bin/sh", Duration::ZERO).with_args(["-c", "exit 0"]);

        let pid = launch(&tool, None).expect("launch should succeed");
        assert!(pid > 0);
    }

    #[tokio::test]
    async fn test_launch_without_target_drops_placeholder() {
        let temp = tempdir().expect("Failed to create temp dir");
        let marker = temp.path().join("args");
        let script = format!(r#"echo "$#" > '{}'"#, marker.display());
        let tool =
            ToolSpec::new("/bin/sh", Duration::ZERO).with_args(["-c", script.as_str(), "sh", "{target}"]);

        launch(&tool, None).expect("launch should succeed");

        let mut recorded = String::new();
        for _ in 0..50 {
            if let Ok(content) = std::fs::read_to_string(&marker) {
                if !content.is_empty() {
                    recorded = content;
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(recorded.trim(), "0");
    }

    #[tokio::test]
    async fn test_launch_passes_non_utf8_path_verbatim() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = tempdir().expect("Failed to create temp dir");
        let document = temp.path().join(OsStr::from_bytes(b"invoice_\xfe\xff.pdf"));
        std::fs::write(&document, b"%PDF").unwrap();
        let marker = temp.path().join("copy");
        let script = format!(r#"cat "$1" > '{}'"#, marker.display());
        let tool =
            ToolSpec::new("/bin/sh", Duration::ZERO).with_args(["-c", script.as_str(), "sh", "{target}"]);
        let target = AnalysisTarget::document(&document).unwrap();

        launch(&tool, Some(&target)).expect("launch should succeed");

        let mut copied = Vec::new();
        for _ in 0..50 {
            if let Ok(content) = std::fs::read(&marker) {
                if !content.is_empty() {
                    copied = content;
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(copied, b"%PDF");
    }

    #[tokio::test]
    async fn test_launch_missing_application_fails() {
        let tool = ToolSpec::new("/nonexistent/bin/thunar", Duration::ZERO);
        let target = AnalysisTarget::Url {
            value: "https://example.com".to_string(),
        };

        match launch(&tool, Some(&target)) {
            Err(Error::LaunchFailed { program, .. }) => assert_eq!(program, "thunar"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
