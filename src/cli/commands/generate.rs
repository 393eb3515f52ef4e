use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use super::output::{self, OutputArgs};
use crate::api::GeminiClient;
use crate::config::Config;
use crate::core::ImageAsset;

#[derive(Args)]
pub struct GenerateArgs {
    /// Base architectural image (geometry and framing are kept)
    #[arg(required = true)]
    pub base: PathBuf,

    /// Lighting reference image (mood and atmosphere are taken from it)
    #[arg(required = true)]
    pub reference: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub async fn run(args: GenerateArgs, config: &Config) -> Result<()> {
    let base_path = args.base.canonicalize()
        .with_context(|| format!("Base image not found: {}", args.base.display()))?;
    let reference_path = args.reference.canonicalize()
        .with_context(|| format!("Reference image not found: {}", args.reference.display()))?;

    let mut session = args.output.session(config);
    session.set_base_image(ImageAsset::from_path(&base_path));
    session.set_reference_image(ImageAsset::from_path(&reference_path));

    if let Some(ratio) = session.aspect_ratio() {
        tracing::info!("Base image aspect ratio: {}", ratio);
    }

    // Credentials are checked before anything is sent
    let client = GeminiClient::from_config(config)?;

    let pb = output::spinner(
        &args.output.format,
        format!(
            "Generating variations: {} + {}...",
            ImageAsset::from_path(&base_path).label(),
            ImageAsset::from_path(&reference_path).label()
        ),
    )?;

    if let Err(e) = session.generate(&client).await {
        let message = session.error().map(str::to_string).unwrap_or_else(|| e.to_string());
        output::report_failure(pb, &args.output.format, "Generation", &message);
        return Err(e.into());
    }

    output::report_batch(&mut session, pb, &args.output, config, client.model()).await
}
