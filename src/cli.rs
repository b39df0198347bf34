use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Sync SoundCloud/Bandcamp releases into the site's project catalog
#[derive(Parser)]
#[command(name = "cardsync")]
#[command(about = "Syncs platform releases into the site's project catalog", long_about = None)]
pub struct Cli {
    /// Config file (defaults to ./cardsync.toml, then the user config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scrape all sources and rewrite the catalog (the default)
    Sync,
    /// Show the events file split into upcoming and past
    Events {
        /// Reference date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        today: Option<chrono::NaiveDate>,
    },
}
