use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::asset::{EncodedImage, ImageAsset};
use super::batch::{generate_variations, revariate_image, ImageGenerator, BATCH_SIZE};
use super::error::{Result, StudioError};
use super::prompt::PromptKind;

pub const DEFAULT_PREFIX: &str = "archviz";

const MISSING_INPUTS: &str = "Please load both the base image and the reference image.";
const MISSING_REFERENCE: &str = "The original reference image is required for re-variation.";

/// One image in the current batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub id: String,
    /// `data:{mime};base64,{payload}`
    pub src: String,
}

impl GeneratedImage {
    pub fn new(src: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            src,
        }
    }

    pub fn mime_type(&self) -> String {
        EncodedImage::parse_data_uri(&self.src).mime_type
    }
}

/// The base render plus the pixel size read when it was selected
#[derive(Debug, Clone)]
pub struct BaseImage {
    pub asset: ImageAsset,
    pub dimensions: Option<(u32, u32)>,
}

/// A batch that has been accepted by the session and is ready to run
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub ticket: u64,
    pub kind: PromptKind,
    pub base: ImageAsset,
    pub reference: ImageAsset,
}

impl BatchRequest {
    pub async fn run<G>(&self, generator: &G) -> Result<Vec<String>>
    where
        G: ImageGenerator + ?Sized,
    {
        match self.kind {
            PromptKind::Initial => generate_variations(generator, &self.base, &self.reference).await,
            PromptKind::Revariation => revariate_image(generator, &self.base, &self.reference).await,
        }
    }
}

/// State of one interactive session.
///
/// Every batch gets a ticket; a completion carrying an older ticket than the
/// latest request is dropped so overlapping requests cannot clobber each other.
#[derive(Debug)]
pub struct Session {
    base: Option<BaseImage>,
    reference: Option<ImageAsset>,
    results: Vec<GeneratedImage>,
    loading: bool,
    revariating: Option<usize>,
    error: Option<String>,
    prefix: String,
    download_counter: u32,
    ticket: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl Session {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            base: None,
            reference: None,
            results: Vec::new(),
            loading: false,
            revariating: None,
            error: None,
            prefix: prefix.into(),
            download_counter: 1,
            ticket: 0,
        }
    }

    /// Select the base render; its dimensions are read from the file header
    pub fn set_base_image(&mut self, asset: ImageAsset) {
        let dimensions = match &asset {
            ImageAsset::File { path, .. } => match image::image_dimensions(path) {
                Ok(dims) => Some(dims),
                Err(e) => {
                    tracing::debug!("Could not read dimensions of {}: {}", path.display(), e);
                    None
                }
            },
            ImageAsset::DataUri(_) => None,
        };
        self.base = Some(BaseImage { asset, dimensions });
    }

    pub fn set_reference_image(&mut self, asset: ImageAsset) {
        self.reference = Some(asset);
    }

    pub fn clear_reference_image(&mut self) {
        self.reference = None;
    }

    pub fn base_image(&self) -> Option<&BaseImage> {
        self.base.as_ref()
    }

    pub fn reference_image(&self) -> Option<&ImageAsset> {
        self.reference.as_ref()
    }

    pub fn results(&self) -> &[GeneratedImage] {
        &self.results
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn revariating_index(&self) -> Option<usize> {
        self.revariating
    }

    pub fn is_revariating(&self, index: usize) -> bool {
        self.revariating == Some(index)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn download_counter(&self) -> u32 {
        self.download_counter
    }

    /// CSS-style ratio of the base image, e.g. "800 / 600"
    pub fn aspect_ratio(&self) -> Option<String> {
        let (w, h) = self.base.as_ref()?.dimensions?;
        Some(format!("{} / {}", w, h))
    }

    pub fn can_generate(&self) -> bool {
        self.base.is_some() && self.reference.is_some() && !self.loading
    }

    /// Change the filename prefix; the counter restarts whenever it changes
    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        let prefix = prefix.into();
        if prefix != self.prefix {
            self.prefix = prefix;
            self.download_counter = 1;
        }
    }

    /// Continue numbering after files already on disk
    pub fn resume_counter(&mut self, next: u32) {
        self.download_counter = next.max(1);
    }

    pub fn next_filename(&self) -> String {
        download_filename(&self.prefix, self.download_counter)
    }

    /// Validate inputs and move into the loading state
    pub fn begin_generate(&mut self) -> Result<BatchRequest> {
        if self.loading {
            return Err(StudioError::validation("A generation is already in progress."));
        }
        let (Some(base), Some(reference)) = (&self.base, &self.reference) else {
            return Err(self.reject(MISSING_INPUTS));
        };
        let request = BatchRequest {
            ticket: self.ticket + 1,
            kind: PromptKind::Initial,
            base: base.asset.clone(),
            reference: reference.clone(),
        };

        self.ticket = request.ticket;
        self.loading = true;
        self.revariating = None;
        self.error = None;
        self.results.clear();
        Ok(request)
    }

    /// Validate inputs and mark `index` as being re-variated
    pub fn begin_revariate(&mut self, index: usize) -> Result<BatchRequest> {
        self.ensure_idle()?;
        let Some(chosen) = self.results.get(index) else {
            if self.reference.is_none() {
                return Err(self.reject(MISSING_REFERENCE));
            }
            return Err(self.reject(&format!("No generated image at position {}.", index + 1)));
        };
        let base = ImageAsset::from_data_uri(chosen.src.clone());
        self.start_revariation(base, Some(index))
    }

    /// Re-variate an image that is not part of the current batch, such as a
    /// previously downloaded result
    pub fn begin_revariate_asset(&mut self, variation: ImageAsset) -> Result<BatchRequest> {
        self.ensure_idle()?;
        self.start_revariation(variation, None)
    }

    fn start_revariation(&mut self, base: ImageAsset, index: Option<usize>) -> Result<BatchRequest> {
        let Some(reference) = &self.reference else {
            return Err(self.reject(MISSING_REFERENCE));
        };
        let request = BatchRequest {
            ticket: self.ticket + 1,
            kind: PromptKind::Revariation,
            base,
            reference: reference.clone(),
        };

        self.ticket = request.ticket;
        self.error = None;
        match index {
            Some(index) => self.revariating = Some(index),
            None => self.loading = true,
        }
        Ok(request)
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.loading || self.revariating.is_some() {
            return Err(StudioError::validation("A generation is already in progress."));
        }
        Ok(())
    }

    /// Record a validation failure as the visible error
    fn reject(&mut self, msg: &str) -> StudioError {
        self.error = Some(msg.to_string());
        StudioError::validation(msg)
    }

    /// Apply the outcome of a batch.
    ///
    /// Returns `false` when the completion is stale and was ignored.
    pub fn complete(&mut self, ticket: u64, outcome: Result<Vec<String>>) -> bool {
        if ticket != self.ticket {
            tracing::debug!("Dropping stale batch result (ticket {} != {})", ticket, self.ticket);
            return false;
        }

        match check_batch(outcome) {
            Ok(images) => {
                self.results = images.into_iter().map(GeneratedImage::new).collect();
            }
            Err(e) => {
                tracing::warn!("Batch failed: {}", e);
                self.error = Some(e.to_string());
            }
        }

        self.loading = false;
        self.revariating = None;
        true
    }

    /// Generate a fresh batch from the selected base and reference
    pub async fn generate<G>(&mut self, generator: &G) -> Result<()>
    where
        G: ImageGenerator + ?Sized,
    {
        let request = self.begin_generate()?;
        let outcome = request.run(generator).await;
        self.finish(request.ticket, outcome)
    }

    /// Replace the batch with variants of an image from outside the session
    pub async fn revariate_asset<G>(&mut self, variation: ImageAsset, generator: &G) -> Result<()>
    where
        G: ImageGenerator + ?Sized,
    {
        let request = self.begin_revariate_asset(variation)?;
        let outcome = request.run(generator).await;
        self.finish(request.ticket, outcome)
    }

    /// Replace the batch with variants of the image at `index`
    pub async fn revariate<G>(&mut self, index: usize, generator: &G) -> Result<()>
    where
        G: ImageGenerator + ?Sized,
    {
        let request = self.begin_revariate(index)?;
        let outcome = request.run(generator).await;
        self.finish(request.ticket, outcome)
    }

    fn finish(&mut self, ticket: u64, outcome: Result<Vec<String>>) -> Result<()> {
        match check_batch(outcome) {
            Ok(images) => {
                self.complete(ticket, Ok(images));
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Batch failed: {}", e);
                if ticket == self.ticket {
                    self.error = Some(e.to_string());
                    self.loading = false;
                    self.revariating = None;
                }
                Err(e)
            }
        }
    }

    /// Save the image at `index` into `dir` under the next sequential name
    pub async fn download(&mut self, index: usize, dir: &Path) -> Result<PathBuf> {
        let image = self
            .results
            .get(index)
            .ok_or_else(|| StudioError::Validation(format!("No generated image at position {}.", index + 1)))?;

        let bytes = EncodedImage::parse_data_uri(&image.src).decode_bytes()?;

        fs::create_dir_all(dir).await?;

        // Never replace an earlier download; move past names already on disk
        let mut counter = self.download_counter;
        let (path, mut file) = loop {
            let path = dir.join(download_filename(&self.prefix, counter));
            match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!("{} exists, trying next name", path.display());
                    counter += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };
        file.write_all(&bytes).await?;
        file.flush().await?;

        self.download_counter = counter + 1;
        tracing::info!("Saved image to: {}", path.display());
        Ok(path)
    }
}

/// Only a full batch is accepted; anything shorter is reported as a failure
fn check_batch(outcome: Result<Vec<String>>) -> Result<Vec<String>> {
    let images = outcome?;
    if images.len() != BATCH_SIZE {
        return Err(StudioError::ApiError {
            message: format!("Expected {} images but received {}.", BATCH_SIZE, images.len()),
            source: None,
        });
    }
    Ok(images)
}

/// `{prefix}_mood_{NNN}.png`
pub fn download_filename(prefix: &str, counter: u32) -> String {
    format!("{}_mood_{:03}.png", prefix, counter)
}

/// First counter after every `{prefix}_mood_NNN.png` already present in `dir`
pub fn next_free_counter(dir: &Path, prefix: &str) -> u32 {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 1;
    };
    let marker = format!("{}_mood_", prefix);

    entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            name.strip_prefix(&marker)?
                .strip_suffix(".png")?
                .parse::<u32>()
                .ok()
        })
        .max()
        .map(|n| n + 1)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::batch::testing::MockGenerator;
    use crate::core::prompt::revariation_prompt;
    use std::collections::HashSet;

    fn data_uri(tag: &str) -> ImageAsset {
        ImageAsset::from_data_uri(format!("data:image/png;base64,{}", tag))
    }

    fn ready_session() -> Session {
        let mut session = Session::default();
        session.set_base_image(data_uri("YmFzZQ=="));
        session.set_reference_image(data_uri("cmVm"));
        session
    }

    #[tokio::test]
    async fn generate_fills_batch_with_unique_ids() {
        let generator = MockGenerator::default();
        let mut session = ready_session();

        session.generate(&generator).await.unwrap();

        assert_eq!(session.results().len(), BATCH_SIZE);
        let ids: HashSet<_> = session.results().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), BATCH_SIZE);
        assert!(!session.is_loading());
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn generate_without_inputs_is_validation_error() {
        let generator = MockGenerator::default();
        let mut session = Session::default();
        session.set_base_image(data_uri("YmFzZQ=="));

        let err = session.generate(&generator).await.unwrap_err();

        assert!(matches!(err, StudioError::Validation(_)));
        assert_eq!(generator.call_count(), 0);
        assert_eq!(session.error(), Some(MISSING_INPUTS));
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn revariate_without_reference_makes_no_call() {
        let generator = MockGenerator::default();
        let mut session = ready_session();
        session.generate(&generator).await.unwrap();
        let calls_before = generator.call_count();
        session.clear_reference_image();

        let err = session.revariate(0, &generator).await.unwrap_err();

        assert!(matches!(err, StudioError::Validation(_)));
        assert_eq!(generator.call_count(), calls_before);
        assert_eq!(session.error(), Some(MISSING_REFERENCE));
        assert_eq!(session.revariating_index(), None);
    }

    #[tokio::test]
    async fn revariate_replaces_batch_using_chosen_image() {
        let generator = MockGenerator::default();
        let mut session = ready_session();
        session.generate(&generator).await.unwrap();
        let chosen = session.results()[2].src.clone();
        let old_ids: Vec<_> = session.results().iter().map(|r| r.id.clone()).collect();

        session.revariate(2, &generator).await.unwrap();

        assert_eq!(session.results().len(), BATCH_SIZE);
        assert!(session.results().iter().all(|r| !old_ids.contains(&r.id)));
        let bases = generator.bases.lock().unwrap();
        assert!(bases[BATCH_SIZE..]
            .iter()
            .all(|b| b == &ImageAsset::DataUri(chosen.clone())));
        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.last().map(String::as_str), Some(revariation_prompt()));
    }

    #[tokio::test]
    async fn failed_revariation_keeps_prior_results() {
        let mut session = ready_session();
        session.generate(&MockGenerator::default()).await.unwrap();
        let before = session.results().to_vec();

        let failing = MockGenerator::failing_on(3);
        let err = session.revariate(1, &failing).await.unwrap_err();

        assert!(matches!(err, StudioError::ApiError { .. }));
        assert_eq!(session.results(), before.as_slice());
        assert_eq!(session.error(), Some("API error: call 3 failed"));
        assert_eq!(session.revariating_index(), None);
    }

    #[tokio::test]
    async fn failed_generation_leaves_batch_empty() {
        let mut session = ready_session();
        session.generate(&MockGenerator::default()).await.unwrap();

        let failing = MockGenerator::failing_on(3);
        assert!(session.generate(&failing).await.is_err());

        assert!(session.results().is_empty());
        assert!(session.error().is_some());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn revariate_asset_fills_batch_from_outside_image() {
        let generator = MockGenerator::default();
        let mut session = Session::default();
        session.set_reference_image(data_uri("cmVm"));
        let variation = data_uri("dmFy");

        session.revariate_asset(variation.clone(), &generator).await.unwrap();

        assert_eq!(session.results().len(), BATCH_SIZE);
        assert!(!session.is_loading());
        assert!(generator.bases.lock().unwrap().iter().all(|b| b == &variation));
    }

    #[test]
    fn stale_completion_is_dropped() {
        let mut session = ready_session();
        let first = session.begin_generate().unwrap();
        // Settle the first request, then start a second one
        session.complete(
            first.ticket,
            Ok(vec!["data:image/png;base64,YQ==".to_string(); BATCH_SIZE]),
        );
        let second = session.begin_revariate(0).unwrap();

        let applied = session.complete(
            first.ticket,
            Ok(vec!["data:image/png;base64,Yg==".to_string(); BATCH_SIZE]),
        );

        assert!(!applied);
        assert!(session.is_revariating(0));
        assert!(session.complete(second.ticket, Err(StudioError::NoImageReturned)));
        assert_eq!(session.error(), Some("No image generated from API."));
        assert_eq!(session.results()[0].src, "data:image/png;base64,YQ==");
    }

    #[test]
    fn busy_session_refuses_new_batches() {
        let mut session = ready_session();
        session.begin_generate().unwrap();

        assert!(!session.can_generate());
        assert!(matches!(
            session.begin_generate(),
            Err(StudioError::Validation(_))
        ));
    }

    #[test]
    fn download_names_are_sequential_per_prefix() {
        let mut session = Session::default();
        let mut names = Vec::new();
        for _ in 0..3 {
            names.push(session.next_filename());
            session.download_counter += 1;
        }
        assert_eq!(
            names,
            ["archviz_mood_001.png", "archviz_mood_002.png", "archviz_mood_003.png"]
        );

        session.set_prefix("villa");
        assert_eq!(session.download_counter(), 1);
        assert_eq!(session.next_filename(), "villa_mood_001.png");

        session.download_counter = 5;
        session.set_prefix("villa");
        assert_eq!(session.download_counter(), 5);
    }

    #[tokio::test]
    async fn download_writes_payload_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = ready_session();
        session.generate(&MockGenerator::default()).await.unwrap();

        let first = session.download(0, dir.path()).await.unwrap();
        let second = session.download(3, dir.path()).await.unwrap();

        assert_eq!(first.file_name().unwrap(), "archviz_mood_001.png");
        assert_eq!(second.file_name().unwrap(), "archviz_mood_002.png");
        assert_eq!(std::fs::read(&first).unwrap(), b"img1");
        assert_eq!(std::fs::read(&second).unwrap(), b"img4");
        assert_eq!(session.download_counter(), 3);
    }

    #[tokio::test]
    async fn download_after_prefix_round_trip_keeps_earlier_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = ready_session();
        session.generate(&MockGenerator::default()).await.unwrap();

        let first = session.download(0, dir.path()).await.unwrap();
        session.set_prefix("villa");
        session.set_prefix("archviz");
        assert_eq!(session.next_filename(), "archviz_mood_001.png");
        let second = session.download(3, dir.path()).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(second.file_name().unwrap(), "archviz_mood_002.png");
        assert_eq!(std::fs::read(&first).unwrap(), b"img1");
        assert_eq!(std::fs::read(&second).unwrap(), b"img4");
        assert_eq!(session.next_filename(), "archviz_mood_003.png");
    }

    #[tokio::test]
    async fn failed_download_keeps_counter() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let mut session = ready_session();
        session.generate(&MockGenerator::default()).await.unwrap();

        assert!(session.download(0, &blocker).await.is_err());
        assert_eq!(session.download_counter(), 1);
    }

    #[test]
    fn aspect_ratio_from_base_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("base.png");
        image::RgbImage::new(800, 600).save(&path).unwrap();

        let mut session = Session::default();
        assert_eq!(session.aspect_ratio(), None);

        session.set_base_image(ImageAsset::from_path(&path));

        assert_eq!(session.aspect_ratio().as_deref(), Some("800 / 600"));
        assert!(!session.can_generate());
    }

    #[test]
    fn next_free_counter_skips_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(next_free_counter(dir.path(), "archviz"), 1);

        for name in ["archviz_mood_001.png", "archviz_mood_007.png", "other_mood_050.png", "archviz_mood_x.png"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        assert_eq!(next_free_counter(dir.path(), "archviz"), 8);
        assert_eq!(next_free_counter(dir.path(), "other"), 51);
    }
}
