//! CLI argument definitions using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Investigation Container dashboard
///
/// Hands documents and URLs to the container's analysis tools and keeps
/// track of past investigations.
#[derive(Parser, Debug)]
#[command(name = "invc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug-level logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze one or more documents (run concurrently)
    Analyze {
        /// Documents to analyze
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Investigate a URL
    Investigate {
        /// URL to investigate
        url: String,
    },

    /// List past investigations, newest first
    Results {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Open a past investigation in the file manager
    Open {
        /// Result directory name, or the label shown by `invc results`
        record: String,
    },

    /// Open a document in the safe viewer
    View {
        /// Document to view
        path: PathBuf,
    },

    /// Browse a URL in the text-mode browser
    Browse {
        /// URL to browse
        url: String,
    },

    /// Open the file manager
    Folder {
        /// `downloads`, `investigations`, or a path (file manager only when omitted)
        location: Option<String>,
    },

    /// Start a desktop application
    Launch {
        /// Application name (see `invc doctor` for the configured list)
        app: String,
    },

    /// Check configured tools and directories
    Doctor,

    /// Show version
    Version,
}
