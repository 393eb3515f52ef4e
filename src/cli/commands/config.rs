use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use crate::config::Config;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show all configuration values
    Show,

    /// Get a specific configuration value
    Get {
        /// Config key (e.g., api.model, output.prefix)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Config key (e.g., api.key, output.directory)
        key: String,
        /// Value to set
        value: String,
    },

    /// Show the config file path
    Path,

    /// Reset configuration to defaults
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

pub fn run(args: ConfigArgs, config: &mut Config) -> Result<()> {
    match args.command {
        Some(ConfigCommand::Show) | None => show_config(config),
        Some(ConfigCommand::Get { key }) => get_config(&key, config),
        Some(ConfigCommand::Set { key, value }) => set_config(&key, &value, config),
        Some(ConfigCommand::Path) => show_path(config),
        Some(ConfigCommand::Reset { force }) => reset_config(force, config),
    }
}

fn show_config(config: &Config) -> Result<()> {
    println!("{}", "Configuration".cyan().bold());
    println!("{}", "=".repeat(50));
    println!();

    let mut section = "";
    for &key in Config::keys() {
        let (group, name) = key.split_once('.').unwrap_or(("", key));
        if group != section {
            if !section.is_empty() {
                println!();
            }
            println!("[{}]", group.yellow());
            section = group;
        }
        let value = config
            .get(key)
            .unwrap_or_else(|| "(not set)".dimmed().to_string());
        println!("  {} = {}", name.bold(), value);
    }
    println!();

    println!("{}", format!("Config file: {}", config.config_path.display()).dimmed());

    Ok(())
}

fn get_config(key: &str, config: &Config) -> Result<()> {
    match config.get(key) {
        Some(value) => println!("{}", value),
        None if Config::keys().contains(&key) => println!("(not set)"),
        None => {
            eprintln!("{}: Unknown config key '{}'", "Error".red().bold(), key);
            eprintln!();
            eprintln!("Available keys:");
            for k in Config::keys() {
                eprintln!("  {}", k);
            }
        }
    }
    Ok(())
}

fn set_config(key: &str, value: &str, config: &mut Config) -> Result<()> {
    config.set(key, value)?;
    config.save()?;

    let shown = if key == "api.key" { "****" } else { value };
    println!("{} Set {} = {}", "✓".green(), key.cyan(), shown);
    Ok(())
}

fn show_path(config: &Config) -> Result<()> {
    println!("{}", config.config_path.display());
    Ok(())
}

fn reset_config(force: bool, config: &mut Config) -> Result<()> {
    if !force {
        eprintln!(
            "{}: This will reset all configuration to defaults. Use --force to confirm.",
            "Warning".yellow().bold()
        );
        return Ok(());
    }

    // Preserve the path
    let path = config.config_path.clone();

    // Reset to defaults
    *config = Config::default();
    config.config_path = path;

    // The environment still wins for this process
    config.api.env_key = crate::config::env_api_key();

    config.save()?;

    println!("{} Configuration reset to defaults", "✓".green());
    Ok(())
}
