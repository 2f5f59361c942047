use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use log::info;

use keystore::cli::{Cli, Command};
use keystore::config::Config;
use keystore::{FileStore, KeyValueStore};

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(store_dir) = cli.store_dir {
        config.store_dir = store_dir;
    }
    if let Some(origin) = cli.origin {
        config.origin = origin;
    }

    info!("keystore opening {} ({})", config.store_dir.display(), config.origin);
    let store = FileStore::open(&config.store_dir, &config.origin)?;

    match cli.command {
        Command::Get { key } => match store.get(&key)? {
            Some(value) => println!("{}", value),
            None => bail!("Key not found: {}", key),
        },
        Command::Set { key, value } => {
            store.set(&key, &value)?;
            println!("{} Set {}", "✓".green(), key.cyan());
        }
        Command::Remove { key } => {
            if store.remove(&key)? {
                println!("{} Removed {}", "✓".green(), key.cyan());
            } else {
                println!("{} No such key: {}", "!".yellow(), key);
            }
        }
        Command::List => {
            let keys = store.keys()?;
            if keys.is_empty() {
                println!("No keys found");
            } else {
                for key in keys {
                    let value = store.get(&key)?.unwrap_or_default();
                    println!("{} = {}", key.cyan(), value);
                }
            }
        }
        Command::Clear => {
            let count = store.clear()?;
            println!("{} Cleared {} key(s)", "✓".green(), count);
        }
    }

    Ok(())
}
