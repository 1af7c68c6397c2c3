//! External tool configuration and execution.
//!
//! Provides:
//! - `ToolSpec`: how to invoke one external program
//! - `ToolRegistry`: capability key → tool, resolved at configuration time
//! - `invoker`: bounded, captured invocation of analysis tools
//! - `launcher`: detached launching of viewers, browsers and desktop apps

pub mod invoker;
pub mod launcher;

use crate::error::{Error, Result};
use crate::types::AnalysisTarget;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use invoker::{ProcessInvoker, ToolInvoker};

/// Placeholder replaced by the document path or URL
pub const TARGET_PLACEHOLDER: &str = "{target}";

/// Placeholder replaced by the result root directory
pub const RESULTS_PLACEHOLDER: &str = "{results}";

/// How to invoke one external program. Immutable once configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    pub executable: PathBuf,
    /// Argument template; each entry becomes exactly one argument
    pub args: Vec<String>,
    pub timeout: Duration,
    /// Substituted for `{results}`
    pub results_dir: Option<PathBuf>,
}

impl ToolSpec {
    /// A tool that receives the target as its only argument.
    pub fn new(executable: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            executable: executable.into(),
            args: vec![TARGET_PLACEHOLDER.to_string()],
            timeout,
            results_dir: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = Some(dir.into());
        self
    }

    /// Build the argument vector for `target`.
    ///
    /// Placeholders are substituted inside each template entry; the result is
    /// never re-split, so whitespace and shell metacharacters in the target
    /// stay inside a single argument. Non-UTF-8 paths pass through unchanged.
    pub fn build_args(&self, target: &AnalysisTarget) -> Vec<OsString> {
        let target_arg = target.as_arg();
        let results = self
            .results_dir
            .as_deref()
            .map(Path::as_os_str)
            .unwrap_or_default();

        self.args
            .iter()
            .map(|arg| substitute(arg, &target_arg, results))
            .collect()
    }

    /// Name used in logs and error messages.
    pub fn program_name(&self) -> String {
        self.executable
            .file_name()
            .unwrap_or(self.executable.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    /// Check whether the executable can be found, either at its path or on `PATH`.
    pub fn is_available(&self) -> bool {
        resolve_executable(&self.executable).is_some()
    }
}

/// Replace every placeholder in `template`, splicing values in as raw `OsStr`.
fn substitute(template: &str, target: &OsStr, results: &OsStr) -> OsString {
    let mut out = OsString::with_capacity(template.len());
    let mut rest = template;

    loop {
        let next = [(TARGET_PLACEHOLDER, target), (RESULTS_PLACEHOLDER, results)]
            .into_iter()
            .filter_map(|(placeholder, value)| rest.find(placeholder).map(|at| (at, placeholder, value)))
            .min_by_key(|(at, ..)| *at);

        let Some((at, placeholder, value)) = next else {
            out.push(rest);
            return out;
        };
        out.push(&rest[..at]);
        out.push(value);
        rest = &rest[at + placeholder.len()..];
    }
}

/// Resolve an executable the way the OS would when spawning it.
pub fn resolve_executable(executable: &Path) -> Option<PathBuf> {
    if executable.components().count() > 1 {
        return executable.is_file().then(|| executable.to_path_buf());
    }
    which::which(executable).ok()
}

/// Capability keys the dashboard dispatches on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    DocumentAnalysis,
    UrlInvestigation,
    SafeView,
    UrlBrowser,
    FileManager,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::DocumentAnalysis,
        Capability::UrlInvestigation,
        Capability::SafeView,
        Capability::UrlBrowser,
        Capability::FileManager,
    ];
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::DocumentAnalysis => write!(f, "document-analysis"),
            Capability::UrlInvestigation => write!(f, "url-investigation"),
            Capability::SafeView => write!(f, "safe-view"),
            Capability::UrlBrowser => write!(f, "url-browser"),
            Capability::FileManager => write!(f, "file-manager"),
        }
    }
}

impl std::str::FromStr for Capability {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "document-analysis" => Ok(Capability::DocumentAnalysis),
            "url-investigation" => Ok(Capability::UrlInvestigation),
            "safe-view" => Ok(Capability::SafeView),
            "url-browser" => Ok(Capability::UrlBrowser),
            "file-manager" => Ok(Capability::FileManager),
            _ => Err(format!("Invalid capability: {}", s)),
        }
    }
}

/// Registry of configured tools.
///
/// Built once at startup; call sites look tools up by capability or by
/// application name instead of naming executables ad hoc.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<Capability, ToolSpec>,
    apps: HashMap<String, ToolSpec>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, capability: Capability, spec: ToolSpec) -> &mut Self {
        self.tools.insert(capability, spec);
        self
    }

    pub fn register_app(&mut self, name: impl Into<String>, spec: ToolSpec) -> &mut Self {
        self.apps.insert(name.into(), spec);
        self
    }

    pub fn get(&self, capability: Capability) -> Option<&ToolSpec> {
        self.tools.get(&capability)
    }

    /// Look up a capability, failing with `UnknownTool` when unconfigured.
    pub fn require(&self, capability: Capability) -> Result<&ToolSpec> {
        self.get(capability)
            .ok_or_else(|| Error::UnknownTool(capability.to_string()))
    }

    pub fn app(&self, name: &str) -> Result<&ToolSpec> {
        self.apps
            .get(name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))
    }

    /// Registered application names, sorted.
    pub fn app_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.apps.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn capabilities(&self) -> impl Iterator<Item = (Capability, &ToolSpec)> {
        Capability::ALL
            .into_iter()
            .filter_map(|c| self.tools.get(&c).map(|spec| (c, spec)))
    }
}
