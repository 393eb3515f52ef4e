use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod cli;
mod config;
mod core;
mod http_client;
mod tui;

use cli::{Cli, Commands};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; the TUI owns the terminal, so it only logs when asked to
    if cli.command.is_some() || std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    // Load or create config
    let mut config = Config::load_or_create()?;

    match cli.command {
        Some(Commands::Generate(args)) => {
            cli::commands::generate::run(args, &config).await?;
        }
        Some(Commands::Revariate(args)) => {
            cli::commands::revariate::run(args, &config).await?;
        }
        Some(Commands::Config(args)) => {
            cli::commands::config::run(args, &mut config)?;
        }
        None => {
            // Launch TUI
            tui::run(&mut config).await?;
        }
    }

    Ok(())
}
