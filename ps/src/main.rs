//! pillsync - placeholder pill editing CLI
//!
//! Renders, fills and inspects catalog templates from the command line.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail, eyre};
use tracing::{debug, info};

use pillsync::cli::{Cli, Command, vars_to_map};
use pillsync::config::Config;
use pillsync::surface::{SelectionTiming, Surface};
use pillsync::sync::Origin;
use pillsync::template::fill_placeholders;
use pillsync::window::{EditorWindow, WindowRole};
use varkit::{Language, Template, TemplateCatalog, VariableMap, resolve_variable_value};

fn parse_level(level_str: Option<&str>) -> tracing::Level {
    match level_str.map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Priority: CLI --log-level > config file > default (INFO)
    let level = parse_level(cli_log_level.or(config_log_level));
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pillsync")
        .join("logs");
    let log_file = fs::create_dir_all(&log_dir)
        .context("Failed to create log directory")
        .and_then(|_| fs::File::create(log_dir.join("pillsync.log")).context("Failed to create log file"));

    match log_file {
        Ok(file) => tracing_subscriber::fmt()
            .with_writer(file)
            .with_ansi(false)
            .with_env_filter(filter)
            .init(),
        Err(e) => {
            eprintln!("Warning: {e:#}, logging to stderr");
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_env_filter(filter)
                .init()
        }
    }

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

fn load_catalog(cli: &Cli, config: &Config) -> Result<TemplateCatalog> {
    let path = cli
        .catalog
        .clone()
        .or_else(|| config.catalog.clone())
        .ok_or_else(|| eyre!("No template catalog configured (use --catalog or set catalog in config)"))?;
    TemplateCatalog::load(&path).context(format!("Failed to load catalog from {}", path.display()))
}

fn find_template<'a>(catalog: &'a TemplateCatalog, id: &str) -> Result<&'a Template> {
    match catalog.get(id) {
        Some(template) => Ok(template),
        None => bail!("Template not found: {}", id),
    }
}

fn cmd_render(template: &Template, values: &VariableMap, language: Language, config: &Config) {
    let timing = config.editor.timing();
    let subject = Surface::new(template.subject(language), values, language, timing);
    let body = Surface::new(template.body(language), values, language, timing);
    println!("{}", "Subject:".bold());
    println!("{}", subject.html());
    println!("{}", "Body:".bold());
    println!("{}", body.html());
}

fn cmd_text(template: &Template, values: Option<&VariableMap>, language: Language) {
    let subject = template.subject(language);
    let body = template.body(language);
    match values {
        Some(values) => {
            println!("{}", fill_placeholders(subject, values, language));
            println!();
            println!("{}", fill_placeholders(body, values, language));
        }
        None => {
            let empty = VariableMap::new();
            let timing = SelectionTiming::default();
            println!("{}", Surface::new(subject, &empty, language, timing).plain_text());
            println!();
            println!("{}", Surface::new(body, &empty, language, timing).plain_text());
        }
    }
}

fn cmd_fields(catalog: &TemplateCatalog, template: &Template, values: VariableMap, config: &Config) -> Result<()> {
    let storage = &config.storage;
    let origin = Origin::open(&storage.store_dir, &storage.origin, &config.sync.topic, config.sync.capacity)
        .context(format!("Failed to open store in {}", storage.store_dir.display()))?;
    let window = EditorWindow::open(WindowRole::Main, &origin, template, &catalog.variables, values, config);
    let cards = window.cards();
    if cards.is_empty() {
        println!("No fields found");
        return Ok(());
    }
    for card in cards {
        let mark = if card.filled { "✓".green() } else { "·".yellow() };
        let shown = if card.filled {
            card.value.normal()
        } else if card.placeholder.is_empty() {
            "(empty)".dimmed()
        } else {
            format!("e.g. {}", card.placeholder).dimmed()
        };
        let focus = if card.focused { " <".bold() } else { "".normal() };
        println!("{} {} [{:?}] {}: {}{}", mark, card.name.cyan(), card.format, card.label, shown, focus);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(lang) = cli.lang {
        config.language = lang;
    }
    let language = config.language;

    debug!(command = ?cli.command, %language, "main: dispatching command");
    match &cli.command {
        Command::Render { template, vars } => {
            let catalog = load_catalog(&cli, &config)?;
            let template = find_template(&catalog, template)?;
            cmd_render(template, &vars_to_map(vars), language, &config);
        }
        Command::Text { template } => {
            let catalog = load_catalog(&cli, &config)?;
            let template = find_template(&catalog, template)?;
            cmd_text(template, None, language);
        }
        Command::Fill { template, vars } => {
            let catalog = load_catalog(&cli, &config)?;
            let template = find_template(&catalog, template)?;
            cmd_text(template, Some(&vars_to_map(vars)), language);
        }
        Command::Fields { template, vars } => {
            let catalog = load_catalog(&cli, &config)?;
            let template = find_template(&catalog, template)?;
            cmd_fields(&catalog, template, vars_to_map(vars), &config)?;
        }
        Command::Resolve { name, vars } => {
            let value = resolve_variable_value(&vars_to_map(vars), name, language);
            if value.is_empty() {
                println!("{} {} has no value", "!".yellow(), name);
            } else {
                println!("{}", value);
            }
        }
    }

    Ok(())
}
