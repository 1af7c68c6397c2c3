//! invc - Investigation Container dashboard
//!
//! Terminal front end for the investigation container: hands documents and
//! URLs to the container's analysis tools, renders their output as it arrives
//! and lists past investigations.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cli;
mod commands;
mod config;
mod render;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing (stderr, so tool output on stdout stays clean)
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::from_default_env()
                .add_directive(format!("invc={}", level).parse()?)
                .add_directive(format!("invc_core={}", level).parse()?),
        )
        .init();

    // Load configuration
    let config = config::Config::load()?;

    // Execute command
    match cli.command {
        Commands::Analyze { paths } => commands::analyze::documents(paths, &config).await,
        Commands::Investigate { url } => commands::analyze::url(&url, &config).await,
        Commands::Results { json } => commands::results::list(json, &config),
        Commands::Open { record } => commands::results::open(&record, &config),
        Commands::View { path } => commands::launch::view(&path, &config),
        Commands::Browse { url } => commands::launch::browse(&url, &config),
        Commands::Folder { location } => commands::launch::folder(location.as_deref(), &config),
        Commands::Launch { app } => commands::launch::app(&app, &config),
        Commands::Doctor => commands::doctor::execute(&config),
        Commands::Version => {
            println!("invc {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
