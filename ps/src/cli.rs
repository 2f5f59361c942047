//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use varkit::{Language, VariableMap};

/// pillsync - placeholder editing with cross-window sync
#[derive(Parser)]
#[command(
    name = "ps",
    about = "Render, fill and inspect email templates with placeholder pills",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Template catalog JSON (overrides config)
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Template language, fr or en (overrides config)
    #[arg(long, global = true)]
    pub lang: Option<Language>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render a template's subject and body as pill markup
    Render {
        /// Template id
        template: String,

        /// Variable value, NAME=VALUE (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },

    /// Print the token-shaped text of a template
    Text {
        /// Template id
        template: String,
    },

    /// Print a template with values substituted
    Fill {
        /// Template id
        template: String,

        /// Variable value, NAME=VALUE (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },

    /// List a template's fields in navigation order
    Fields {
        /// Template id
        template: String,

        /// Variable value, NAME=VALUE (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },

    /// Resolve one variable name against the given values
    Resolve {
        /// Variable name, with or without language suffix
        name: String,

        /// Variable value, NAME=VALUE (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },
}

/// Parse a `NAME=VALUE` pair; the value may be empty or contain `=`
pub fn parse_var(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim().to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{s}'")),
    }
}

/// Collect `--var` pairs into a map; later pairs win
pub fn vars_to_map(vars: &[(String, String)]) -> VariableMap {
    vars.iter().cloned().collect()
}
