use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use super::output::{self, OutputArgs};
use crate::api::GeminiClient;
use crate::config::Config;
use crate::core::ImageAsset;

#[derive(Args)]
pub struct RevariateArgs {
    /// A previously generated variation to nudge
    #[arg(required = true)]
    pub variation: PathBuf,

    /// The original lighting reference image
    #[arg(required = true)]
    pub reference: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub async fn run(args: RevariateArgs, config: &Config) -> Result<()> {
    let variation_path = args.variation.canonicalize()
        .with_context(|| format!("Variation image not found: {}", args.variation.display()))?;
    let reference_path = args.reference.canonicalize()
        .with_context(|| format!("Reference image not found: {}", args.reference.display()))?;

    let mut session = args.output.session(config);
    session.set_reference_image(ImageAsset::from_path(&reference_path));

    let client = GeminiClient::from_config(config)?;

    let variation = ImageAsset::from_path(&variation_path);
    let pb = output::spinner(
        &args.output.format,
        format!("Re-variating {}...", variation.label()),
    )?;

    if let Err(e) = session.revariate_asset(variation, &client).await {
        let message = session.error().map(str::to_string).unwrap_or_else(|| e.to_string());
        output::report_failure(pb, &args.output.format, "Re-variation", &message);
        return Err(e.into());
    }

    output::report_batch(&mut session, pb, &args.output, config, client.model()).await
}
