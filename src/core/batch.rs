use async_trait::async_trait;
use futures_util::future::try_join_all;

use super::asset::ImageAsset;
use super::error::Result;
use super::prompt::PromptKind;

/// Number of variations produced per batch
pub const BATCH_SIZE: usize = 4;

/// Anything that turns a prompt and an image pair into one generated image.
///
/// Returns the image as a `data:{mime};base64,{payload}` string.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_one(
        &self,
        prompt: &str,
        base: &ImageAsset,
        reference: &ImageAsset,
    ) -> Result<String>;
}

/// Run `n` identical generations concurrently.
///
/// The first failure fails the whole batch; on success results come back in
/// the order the calls were issued.
pub async fn generate_batch<G>(
    generator: &G,
    prompt: &str,
    base: &ImageAsset,
    reference: &ImageAsset,
    n: usize,
) -> Result<Vec<String>>
where
    G: ImageGenerator + ?Sized,
{
    tracing::debug!("Issuing batch of {} generations", n);

    let calls = (0..n).map(|_| generator.generate_one(prompt, base, reference));
    let results = try_join_all(calls).await?;

    tracing::debug!("Batch complete with {} images", results.len());
    Ok(results)
}

/// Blend the reference mood onto the base image, four times over
pub async fn generate_variations<G>(
    generator: &G,
    base: &ImageAsset,
    reference: &ImageAsset,
) -> Result<Vec<String>>
where
    G: ImageGenerator + ?Sized,
{
    generate_batch(
        generator,
        PromptKind::Initial.text(),
        base,
        reference,
        BATCH_SIZE,
    )
    .await
}

/// Four subtle variants of an already generated result
pub async fn revariate_image<G>(
    generator: &G,
    variation: &ImageAsset,
    reference: &ImageAsset,
) -> Result<Vec<String>>
where
    G: ImageGenerator + ?Sized,
{
    generate_batch(
        generator,
        PromptKind::Revariation.text(),
        variation,
        reference,
        BATCH_SIZE,
    )
    .await
}
