use thiserror::Error;

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("{0}")]
    Validation(String),

    #[error("API key not configured. Set GEMINI_API_KEY environment variable or run: lightstudio config set api.key <your-key>")]
    MissingApiKey,

    #[error("No image generated from API.")]
    NoImageReturned,

    #[error("API error: {message}")]
    ApiError {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Invalid image data: {0}")]
    InvalidImage(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<reqwest::Error> for StudioError {
    fn from(err: reqwest::Error) -> Self {
        StudioError::ApiError {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl StudioError {
    pub fn validation(msg: impl Into<String>) -> Self {
        StudioError::Validation(msg.into())
    }
}

pub type Result<T, E = StudioError> = std::result::Result<T, E>;
