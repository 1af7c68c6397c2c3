//! Configuration management for invc.
//!
//! Configuration is loaded from multiple sources with precedence:
//! 1. Environment variables (INVC_*)
//! 2. Config file (INVC_CONFIG, or config.toml in the data directory)
//! 3. Default values

use anyhow::{Context, Result};
use directories::ProjectDirs;
use invc_core::{Capability, ResultStore, ToolRegistry, ToolSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directories
    #[serde(default)]
    pub paths: PathsConfig,

    /// Analysis tools and viewers, by capability
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Desktop applications available to `invc launch`: name -> executable
    #[serde(default = "default_apps")]
    pub apps: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Result root scanned for past investigations
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Where suspicious downloads land
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
}

/// Per-capability sections as written in the file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ToolsConfig {
    #[serde(default)]
    pub document_analysis: ToolOverride,

    #[serde(default)]
    pub url_investigation: ToolOverride,

    #[serde(default)]
    pub safe_view: ToolOverride,

    #[serde(default)]
    pub url_browser: ToolOverride,

    #[serde(default)]
    pub file_manager: ToolOverride,
}

/// One `[tools.<capability>]` section. Unset fields keep the capability's defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,

    /// Argument template; `{target}` and `{results}` are substituted per argument
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,

    /// Kill the tool after this many seconds (analysis tools only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ToolOverride {
    fn apply(&self, mut base: ToolConfig) -> ToolConfig {
        if let Some(executable) = &self.executable {
            base.executable = executable.clone();
        }
        if let Some(args) = &self.args {
            base.args = args.clone();
        }
        if let Some(timeout_secs) = self.timeout_secs {
            base.timeout_secs = timeout_secs;
        }
        base
    }
}

/// One external tool, after defaults and overrides are merged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl ToolConfig {
    fn new(executable: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            executable: executable.into(),
            args: default_args(),
            timeout_secs,
        }
    }

    pub fn to_spec(&self) -> ToolSpec {
        ToolSpec::new(&self.executable, Duration::from_secs(self.timeout_secs)).with_args(self.args.iter().cloned())
    }
}

// Default value functions
fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_data_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("org", "investigation-container", "invc") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        home_dir().join(".invc")
    }
}

fn default_results_dir() -> PathBuf {
    home_dir().join("investigations")
}

fn default_downloads_dir() -> PathBuf {
    home_dir().join("downloads")
}

fn default_tools_dir() -> PathBuf {
    home_dir().join("tools")
}

fn default_args() -> Vec<String> {
    vec!["{target}".to_string()]
}

fn default_document_analysis() -> ToolConfig {
    ToolConfig::new(default_tools_dir().join("analyze_document.sh"), 300) // 5 minutes
}

fn default_url_investigation() -> ToolConfig {
    ToolConfig::new(default_tools_dir().join("investigate_url.sh"), 60)
}

fn default_safe_view() -> ToolConfig {
    ToolConfig::new(default_tools_dir().join("safe_view.sh"), 0)
}

fn default_url_browser() -> ToolConfig {
    ToolConfig {
        executable: PathBuf::from("xfce4-terminal"),
        args: ["-x", "lynx", "{target}"].map(String::from).to_vec(),
        timeout_secs: 0,
    }
}

fn default_file_manager() -> ToolConfig {
    ToolConfig::new("thunar", 0)
}

fn default_apps() -> HashMap<String, String> {
    let mut map = HashMap::new();
    map.insert("gedit".to_string(), "gedit".to_string());
    map.insert("libreoffice".to_string(), "libreoffice".to_string());
    map.insert("firefox".to_string(), "firefox".to_string());
    map.insert("evince".to_string(), "evince".to_string());
    map.insert("terminal".to_string(), "xfce4-terminal".to_string());
    map
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            downloads_dir: default_downloads_dir(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            tools: ToolsConfig::default(),
            apps: default_apps(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
            Self::parse(&content)?
        } else {
            Config::default()
        };

        if let Ok(dir) = std::env::var("INVC_RESULTS_DIR") {
            config.paths.results_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Get the config file path.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("INVC_CONFIG") {
            PathBuf::from(path)
        } else {
            default_data_dir().join("config.toml")
        }
    }

    /// Tool configuration for a capability, file overrides merged over its defaults.
    pub fn tool(&self, capability: Capability) -> ToolConfig {
        let (section, defaults) = match capability {
            Capability::DocumentAnalysis => (&self.tools.document_analysis, default_document_analysis()),
            Capability::UrlInvestigation => (&self.tools.url_investigation, default_url_investigation()),
            Capability::SafeView => (&self.tools.safe_view, default_safe_view()),
            Capability::UrlBrowser => (&self.tools.url_browser, default_url_browser()),
            Capability::FileManager => (&self.tools.file_manager, default_file_manager()),
        };
        section.apply(defaults)
    }

    /// Build the tool registry handed to the dashboard.
    pub fn tool_registry(&self) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for capability in Capability::ALL {
            registry.register(capability, self.tool(capability).to_spec());
        }
        for (name, executable) in &self.apps {
            registry.register_app(
                name.clone(),
                ToolSpec::new(executable, Duration::ZERO).with_args(Vec::<String>::new()),
            );
        }
        registry
    }

    pub fn result_store(&self) -> ResultStore {
        ResultStore::new(&self.paths.results_dir)
    }
}
