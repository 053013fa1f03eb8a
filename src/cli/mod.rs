pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pricelens")]
#[command(about = "Collects shipping-inclusive storefront listings for product codes", long_about = None)]
pub struct Cli {
    /// SQLite database to use instead of the configured one
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract listings for every code in INPUT (stdin when omitted)
    Run {
        /// File with one product code per line
        input: Option<PathBuf>,

        /// Write rows to this CSV file instead of the database
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Keep rows from previous runs
        #[arg(long)]
        no_clear: bool,

        /// Show the browser window
        #[arg(long)]
        headed: bool,
    },
    /// List stored rows
    List {
        /// Only rows for this product code
        #[arg(long)]
        code: Option<String>,
    },
    /// Export stored rows to a CSV file
    Export {
        /// Destination CSV file
        path: PathBuf,
    },
}
