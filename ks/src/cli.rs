//! CLI argument parsing for keystore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ks")]
#[command(author, version, about = "Inspect the editor windows' shared key-value store", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Store directory (overrides config)
    #[arg(short, long)]
    pub store_dir: Option<PathBuf>,

    /// Origin to open (overrides config)
    #[arg(short, long)]
    pub origin: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the value stored under a key
    Get {
        #[arg(required = true)]
        key: String,
    },

    /// Store a value under a key
    Set {
        #[arg(required = true)]
        key: String,

        #[arg(required = true)]
        value: String,
    },

    /// Remove a key
    Remove {
        #[arg(required = true)]
        key: String,
    },

    /// List all keys and values
    List,

    /// Remove every key of the origin
    Clear,
}
