pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;

#[derive(Parser)]
#[command(name = "postlink")]
#[command(about = "Mirror Instagram posts and link them to blog articles", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/postlink/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch the profile feed and capture new posts until interrupted
    Ingest,
    /// Link unmapped posts to blog articles by title, then by OCR
    Map,
    /// List captured posts
    Posts {
        /// Show only posts without a blog link
        #[arg(long)]
        unmapped: bool,
    },
}

/// Log a fatal error once, with its full chain, and map it to a process
/// exit status.
pub fn finish(result: anyhow::Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    }
}
