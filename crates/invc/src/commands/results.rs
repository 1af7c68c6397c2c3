//! Investigation history commands.

use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use invc_core::ResultStore;
use invc_core::store::sort_newest_first;
use std::path::PathBuf;

use crate::config::Config;
use crate::render;

pub fn list(json: bool, config: &Config) -> Result<()> {
    let store = config.result_store();
    let mut records = store.list_investigations();
    sort_newest_first(&mut records);

    if json {
        let output = serde_json::to_string_pretty(&records).context("Failed to serialize records")?;
        println!("{}", output);
        return Ok(());
    }

    println!("{}", "Investigation Results".cyan().bold());
    println!("{}", "─".repeat(72));

    if records.is_empty() {
        println!(
            "  {}",
            format!("No investigations in {}", store.root().display()).dimmed()
        );
        return Ok(());
    }

    println!(
        "  {:<18} {:<10} {:<32} {}",
        "Date".bold(),
        "Type".bold(),
        "Target".bold(),
        "Status".bold()
    );
    for record in &records {
        let [date, kind, target, status] = render::record_row(record);
        println!("  {:<18} {:<10} {:<32} {}", date, kind, target, status.green());
    }
    println!();
    println!("  {} investigation(s) in {}", records.len(), store.root().display());

    Ok(())
}

pub fn open(record: &str, config: &Config) -> Result<()> {
    let store = config.result_store();
    let path = find_record(&store, record).ok_or_else(|| {
        anyhow!(
            "No investigation matches '{}' in {}",
            record,
            store.root().display()
        )
    })?;

    let dashboard = super::dashboard(config);
    dashboard
        .open_folder(Some(&path))
        .with_context(|| format!("Failed to open {}", path.display()))?;

    println!("Opened {}", path.display());
    Ok(())
}

/// Exact directory name first, then the label lookup.
fn find_record(store: &ResultStore, record: &str) -> Option<PathBuf> {
    store
        .locate_dir(record)
        .or_else(|| store.resolve_record_location(record))
}
