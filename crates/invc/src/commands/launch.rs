//! Auxiliary application launchers.

use anyhow::{Context, Result};
use invc_core::Error;
use std::path::{Path, PathBuf};

use crate::config::Config;

pub fn view(path: &Path, config: &Config) -> Result<()> {
    super::dashboard(config)
        .safe_view(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    println!("Opened {} in the safe viewer", path.display());
    Ok(())
}

pub fn browse(url: &str, config: &Config) -> Result<()> {
    super::dashboard(config)
        .browse_url(url)
        .context("Failed to open browser")?;
    println!("Browsing {}", url.trim());
    Ok(())
}

pub fn folder(location: Option<&str>, config: &Config) -> Result<()> {
    let path = location.map(|l| resolve_location(l, config));

    super::dashboard(config)
        .open_folder(path.as_deref())
        .context("Failed to open file manager")?;

    match path {
        Some(path) => println!("Opened {}", path.display()),
        None => println!("Opened file manager"),
    }
    Ok(())
}

pub fn app(name: &str, config: &Config) -> Result<()> {
    let dashboard = super::dashboard(config);
    match dashboard.launch_app(name) {
        Ok(_) => {
            println!("Launched {}", name);
            Ok(())
        }
        Err(Error::UnknownTool(_)) => {
            let known = dashboard.registry().app_names().join(", ");
            anyhow::bail!("Unknown application '{}'. Configured: {}", name, known)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to launch {}", name)),
    }
}

/// Shortcut names for the container's well-known folders.
fn resolve_location(location: &str, config: &Config) -> PathBuf {
    match location {
        "downloads" => config.paths.downloads_dir.clone(),
        "investigations" | "results" => config.paths.results_dir.clone(),
        other => PathBuf::from(other),
    }
}
