//! Diagnostics command.

use anyhow::Result;
use colored::Colorize;
use invc_core::Capability;
use invc_core::tools::resolve_executable;
use std::path::Path;

use crate::config::Config;

pub fn execute(config: &Config) -> Result<()> {
    println!("{}", "invc Doctor".cyan().bold());
    println!("{}", "─".repeat(50));
    println!();

    let mut issues = Vec::new();

    // Check config file
    print!("  Config file: ");
    let config_path = Config::config_path();
    if config_path.exists() {
        println!("{}", format!("✓ {}", config_path.display()).green());
    } else {
        println!("{}", "○ not found (using defaults)".yellow());
    }

    // Check directories
    print!("  Results directory: ");
    if config.paths.results_dir.is_dir() {
        let count = config.result_store().list_investigations().len();
        println!("{}", format!("✓ {} investigation(s)", count).green());
    } else {
        println!("{}", "○ not found (no investigations yet)".yellow());
    }

    print!("  Downloads directory: ");
    if config.paths.downloads_dir.is_dir() {
        println!("{}", "✓ exists".green());
    } else {
        println!("{}", "○ not found".yellow());
    }

    // Check tools
    println!();
    println!("{}", "Tools".cyan());
    for capability in Capability::ALL {
        let tool = config.tool(capability);
        print!("  {}: ", capability);
        if check_executable(&tool.executable) {
            println!("{}", format!("✓ {}", tool.executable.display()).green());
        } else {
            println!("{}", format!("✗ {} not found", tool.executable.display()).red());
            issues.push(format!("{} tool is missing", capability));
        }
    }

    // Check applications
    println!();
    println!("{}", "Applications".cyan());
    let mut apps: Vec<_> = config.apps.iter().collect();
    apps.sort();
    for (name, executable) in apps {
        print!("  {}: ", name);
        if check_executable(Path::new(executable)) {
            println!("{}", "✓ installed".green());
        } else {
            // Optional; the dashboard works without them
            println!("{}", format!("○ {} not installed", executable).yellow());
        }
    }

    println!();
    if issues.is_empty() {
        println!("{}", "All checks passed!".green().bold());
    } else {
        println!("{}", format!("{} issue(s) found:", issues.len()).red().bold());
        for issue in issues {
            println!("  • {}", issue);
        }
    }

    Ok(())
}

fn check_executable(executable: &Path) -> bool {
    resolve_executable(executable).is_some()
}
