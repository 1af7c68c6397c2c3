//! Shared types for invc-core.
//!
//! These types flow between the orchestrator, the result store and the
//! presentation layer.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Targets
// ─────────────────────────────────────────────────────────────────────────────

/// What an investigation is about: a document on disk or a URL.
///
/// Build through `document` or `url`; the variants are public for matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisTarget {
    Document { path: PathBuf },
    Url { value: String },
}

impl AnalysisTarget {
    /// Build a document target. The path must exist at submission time.
    ///
    /// A relative path starting with `-` gets a `./` prefix so tools cannot
    /// read it as an option.
    pub fn document(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidTarget("no document selected".to_string()));
        }
        if !path.exists() {
            return Err(Error::InvalidTarget(format!(
                "document does not exist: {}",
                path.display()
            )));
        }
        Ok(Self::Document {
            path: shield_leading_dash(path),
        })
    }

    /// Build a URL target from user input. Surrounding whitespace is dropped.
    pub fn url(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(Error::InvalidTarget("no URL entered".to_string()));
        }
        if looks_like_option(value.as_bytes()) {
            return Err(Error::InvalidTarget(format!("not a URL: {}", value)));
        }
        Ok(Self::Url {
            value: value.to_string(),
        })
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Document { .. } => TargetKind::Document,
            Self::Url { .. } => TargetKind::Url,
        }
    }

    /// The target as a single tool argument, path bytes untouched.
    pub fn as_arg(&self) -> OsString {
        match self {
            Self::Document { path } => path.clone().into_os_string(),
            Self::Url { value } => OsString::from(value),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Document { path } => Some(path),
            Self::Url { .. } => None,
        }
    }
}

fn looks_like_option(arg: &[u8]) -> bool {
    arg.first() == Some(&b'-')
}

fn shield_leading_dash(path: PathBuf) -> PathBuf {
    if looks_like_option(path.as_os_str().as_encoded_bytes()) {
        Path::new(".").join(path)
    } else {
        path
    }
}

impl std::fmt::Display for AnalysisTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Document { path } => write!(f, "{}", path.display()),
            Self::Url { value } => write!(f, "{}", value),
        }
    }
}

/// Investigation kind, shared by targets and history records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Document,
    Url,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::Document => write!(f, "Document"),
            TargetKind::Url => write!(f, "URL"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tasks
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(uuid::Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short form is enough to tell concurrent tasks apart in output
        let id = self.0.simple().to_string();
        write!(f, "{}", &id[..8])
    }
}

/// Terminal result of one tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The process ran to exit. `exit_code` is `None` when it died by signal.
    Success {
        stdout: String,
        stderr: String,
        exit_code: Option<i32>,
    },
    /// The process outlived its timeout and was killed. Output is discarded.
    TimedOut,
    /// The process could not be started, or the task failed before it could.
    LaunchFailed { message: String },
}

impl TaskOutcome {
    pub fn launch_failed(message: impl Into<String>) -> Self {
        Self::LaunchFailed {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::TimedOut => "timed_out",
            Self::LaunchFailed { .. } => "launch_failed",
        }
    }
}

/// Task lifecycle: `Pending -> Running -> Completed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Completed(TaskOutcome),
}

impl TaskState {
    pub fn name(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Completed(_) => "completed",
        }
    }

    /// Check whether moving to `next` is allowed.
    pub fn can_transition_to(&self, next: &TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Pending, TaskState::Running) | (TaskState::Running, TaskState::Completed(_))
        )
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// History
// ─────────────────────────────────────────────────────────────────────────────

/// One past investigation, reconstructed from its result directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestigationRecord {
    /// Last modification time of the result directory
    pub timestamp: DateTime<Local>,
    pub kind: TargetKind,
    /// Human-readable label shown in the history list
    pub label: String,
    /// Directory name under the result root; stable identifier of the record
    pub dir_name: String,
}
