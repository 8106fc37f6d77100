//! Command-line interface for Clonebox.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Shorten links and store deduplicated files.
#[derive(Debug, Parser)]
#[command(name = "clonebox", version, about)]
pub struct Cli {
    /// Configuration file layered over the bundled defaults
    /// (skips the home and current-directory files)
    #[arg(long, short, global = true, env = "CLONEBOX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit JSON output
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Get the short identifier for a link, registering it if new
    Shorten {
        /// Link to shorten (https:// is assumed when no scheme is given)
        url: String,
    },

    /// Print the link an identifier points to
    Resolve {
        /// Short identifier
        identifier: String,
    },

    /// List the most recently shortened links
    Latest {
        /// Number of links to show (defaults to links.latest_limit)
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// Store a file, or find the identical file already stored
    Upload {
        /// File to upload
        path: PathBuf,

        /// Name to record instead of the file's own name
        #[arg(long)]
        name: Option<String>,
    },

    /// Copy a stored file out by handle
    Download {
        /// Storage handle printed by `upload`
        handle: String,

        /// Destination path
        dest: PathBuf,
    },

    /// Remove abandoned staged uploads
    Sweep {
        /// Minimum age in seconds (defaults to files.staging_ttl_secs)
        #[arg(long)]
        older_than: Option<u64>,
    },

    /// Apply database migrations
    Migrate,
}
