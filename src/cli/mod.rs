pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "lightstudio",
    version,
    about = "Lighting Studio - Professional lighting simulation for architectural visualization",
    long_about = r#"Lighting Studio - Professional lighting simulation for architectural visualization

Takes a base architectural render and a lighting reference, and asks Google
Gemini for four variations of the base with the reference's lighting and mood.
Any result can be re-variated into four subtle alternatives.
Run without arguments to launch the interactive TUI.

SETUP:
  Set your API key via environment variable or config:
    export GEMINI_API_KEY=your-key-here
    lightstudio config set api.key your-key-here

EXAMPLES:
  Generate four variations:
    lightstudio generate render.png sunset.jpg
    lightstudio g render.png foggy-morning.jpg --prefix villa

  Re-variate a result:
    lightstudio revariate lightstudio-output/archviz_mood_002.png sunset.jpg
    lightstudio r villa_mood_001.png foggy-morning.jpg --format json

  Manage configuration:
    lightstudio config show
    lightstudio config set output.prefix villa
    lightstudio config set api.timeout_secs 180

  Launch interactive TUI:
    lightstudio

OUTPUT FORMATS:
  --format text   Human-readable output (default)
  --format json   Machine-readable JSON
  --format quiet  Minimal output, just file paths"#,
    after_help = r#"CONFIGURATION:
  Config file: ~/.config/lightstudio-cli/config.toml (Linux)

  Downloads are named {prefix}_mood_{NNN}.png, numbered from 001 and
  continuing after files already present in the output directory."#
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply a reference image's lighting to a base render
    ///
    /// Sends four identical requests in parallel; either all four variations
    /// come back or the command fails.
    #[command(
        alias = "g",
        after_help = r#"EXAMPLES:
  Basic generation:
    lightstudio generate render.png reference.jpg

  Custom prefix and output directory:
    lightstudio generate render.png dusk.jpg --prefix tower --output ./moods

  Keep results in memory only (JSON includes the data URIs):
    lightstudio generate render.png dusk.jpg --no-download --format json"#
    )]
    Generate(commands::generate::GenerateArgs),

    /// Produce four subtle alternatives of a generated variation
    ///
    /// Uses the original lighting reference and only nudges colour and light
    /// intensity; geometry and framing are kept.
    #[command(
        alias = "r",
        after_help = r#"EXAMPLES:
  Re-variate a downloaded result:
    lightstudio revariate archviz_mood_003.png reference.jpg"#
    )]
    Revariate(commands::revariate::RevariateArgs),

    /// View or modify configuration
    ///
    /// Manage API keys, model, and output settings.
    /// Changes are saved to the config file immediately.
    #[command(
        alias = "c",
        after_help = r#"EXAMPLES:
  Show all settings:
    lightstudio config show

  Set values:
    lightstudio config set api.key YOUR_API_KEY
    lightstudio config set output.directory ~/Pictures/moods

  Reset to defaults:
    lightstudio config reset --force

AVAILABLE SETTINGS:
  api.key               - Gemini API key
  api.model             - Image model
  api.base_url          - API base URL
  api.timeout_secs      - Per-request timeout in seconds (none = wait)
  output.directory      - Where to save images
  output.prefix         - Download filename prefix
  output.auto_download  - Save results automatically (true/false)
  output.display        - Preview mode (terminal/none)"#
    )]
    Config(commands::config::ConfigArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_parses_positional_images() {
        let cli = Cli::try_parse_from(["lightstudio", "g", "base.png", "ref.jpg", "--prefix", "villa"]).unwrap();
        match cli.command {
            Some(Commands::Generate(args)) => {
                assert_eq!(args.base.to_str(), Some("base.png"));
                assert_eq!(args.reference.to_str(), Some("ref.jpg"));
                assert_eq!(args.output.prefix.as_deref(), Some("villa"));
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn no_subcommand_launches_tui() {
        let cli = Cli::try_parse_from(["lightstudio"]).unwrap();
        assert!(cli.command.is_none());
    }
}
