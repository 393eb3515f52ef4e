use anyhow::Result;
use clap::Args;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{Config, DisplayMode};
use crate::core::session::next_free_counter;
use crate::core::Session;

/// Options shared by every command that produces a batch
#[derive(Args)]
pub struct OutputArgs {
    /// Output directory for downloaded images
    #[arg(short, long = "output", value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Filename prefix for downloads ({prefix}_mood_NNN.png)
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Don't download images automatically
    #[arg(long)]
    pub no_download: bool,

    /// Output format (text, json, quiet)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

impl OutputArgs {
    pub fn session(&self, config: &Config) -> Session {
        Session::new(self.prefix.as_deref().unwrap_or(&config.output.prefix))
    }

    pub fn output_dir(&self, config: &Config) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.output.directory))
    }
}

/// Spinner shown while a batch is in flight (text format only)
pub fn spinner(format: &str, message: String) -> Result<Option<ProgressBar>> {
    if format != "text" {
        return Ok(None);
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.yellow} {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(Some(pb))
}

/// Report a failed batch in the requested format
pub fn report_failure(pb: Option<ProgressBar>, format: &str, label: &str, error: &str) {
    if let Some(pb) = pb {
        pb.finish_with_message(format!("{} {} failed", "✗".red(), label));
    }

    match format {
        "json" => println!("{}", json!({ "status": "failed", "error": error })),
        "quiet" => {}
        _ => eprintln!("{}: {}", "Error".red().bold(), error),
    }
}

/// Download (if enabled) and print the session's current batch
pub async fn report_batch(
    session: &mut Session,
    pb: Option<ProgressBar>,
    args: &OutputArgs,
    config: &Config,
    model: &str,
) -> Result<()> {
    let download = !args.no_download && config.output.auto_download;
    let dir = args.output_dir(config);

    let mut paths = Vec::new();
    if download {
        session.resume_counter(next_free_counter(&dir, session.prefix()));
        for index in 0..session.results().len() {
            paths.push(session.download(index, &dir).await?);
        }
    }

    if let Some(pb) = &pb {
        let suffix = if download { "" } else { " (not downloaded)" };
        pb.finish_with_message(format!(
            "{} Generated {} variation(s){}",
            "✓".green(),
            session.results().len(),
            suffix
        ));
    }

    match args.format.as_str() {
        "json" => {
            let images: Vec<_> = session
                .results()
                .iter()
                .enumerate()
                .map(|(i, image)| {
                    let mut entry = json!({
                        "id": image.id,
                        "mime_type": image.mime_type(),
                    });
                    match paths.get(i) {
                        Some(path) => entry["path"] = json!(path),
                        None => entry["data_uri"] = json!(image.src),
                    }
                    entry
                })
                .collect();
            let report = json!({
                "status": "completed",
                "model": model,
                "prefix": session.prefix(),
                "images": images,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "quiet" => {
            for path in &paths {
                println!("{}", path.display());
            }
        }
        _ => {
            println!();
            println!("{}: {}", "Model".cyan().bold(), model);
            println!("{}: {}", "Status".cyan().bold(), "completed".green());
            println!();
            println!("{}:", "Variations".cyan().bold());
            for (i, image) in session.results().iter().enumerate() {
                match paths.get(i) {
                    Some(path) => println!("  [{}] {}", i + 1, path.display()),
                    None => println!("  [{}] {} ({})", i + 1, image.id, image.mime_type()),
                }
            }

            if config.output.display == DisplayMode::Terminal {
                if let Some(first) = paths.first() {
                    println!();
                    display_image_terminal(first);
                }
            }
        }
    }

    Ok(())
}

/// Display an image in the terminal using viuer
fn display_image_terminal(path: &Path) {
    let conf = viuer::Config {
        width: Some(80),
        height: Some(30),
        absolute_offset: false,
        ..Default::default()
    };

    if let Err(e) = viuer::print_from_file(path, &conf) {
        tracing::debug!("Failed to display image in terminal: {}", e);
    }
}
