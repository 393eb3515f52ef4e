pub mod asset;
pub mod batch;
pub mod error;
pub mod prompt;
pub mod session;

pub use asset::{EncodedImage, ImageAsset};
pub use batch::{generate_batch, generate_variations, revariate_image, ImageGenerator, BATCH_SIZE};
pub use error::StudioError;
pub use prompt::PromptKind;
pub use session::{GeneratedImage, Session};
