use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::path::{Path, PathBuf};
use tokio::fs;

use super::error::{Result, StudioError};

/// MIME type assumed for data URIs that carry none
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// An image as selected by the user or returned by the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageAsset {
    /// Local file with the MIME type declared when it was picked
    File { path: PathBuf, mime_type: String },
    /// Already encoded image, `data:{mime};base64,{payload}`
    DataUri(String),
}

/// Base64 payload plus its MIME type, ready to send inline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub mime_type: String,
}

impl ImageAsset {
    /// Select a local file, deriving its MIME type from the extension
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mime_type = mime_type_for_path(&path).to_string();
        ImageAsset::File { path, mime_type }
    }

    pub fn from_data_uri(uri: impl Into<String>) -> Self {
        ImageAsset::DataUri(uri.into())
    }

    /// Short human label (file name or "generated image")
    pub fn label(&self) -> String {
        match self {
            ImageAsset::File { path, .. } => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string()),
            ImageAsset::DataUri(_) => "generated image".to_string(),
        }
    }

    /// Convert to a base64 payload and MIME type
    pub async fn encode(&self) -> Result<EncodedImage> {
        match self {
            ImageAsset::File { path, mime_type } => {
                let bytes = fs::read(path).await?;
                Ok(EncodedImage {
                    data: BASE64.encode(&bytes),
                    mime_type: mime_type.clone(),
                })
            }
            ImageAsset::DataUri(uri) => Ok(EncodedImage::parse_data_uri(uri)),
        }
    }
}

impl EncodedImage {
    /// Split a data URI into payload and MIME type.
    ///
    /// A missing MIME type falls back to [`DEFAULT_MIME_TYPE`]; a string with no
    /// comma is taken as a bare base64 payload.
    pub fn parse_data_uri(uri: &str) -> Self {
        let Some((header, payload)) = uri.split_once(',') else {
            return Self {
                data: uri.to_string(),
                mime_type: DEFAULT_MIME_TYPE.to_string(),
            };
        };

        let mime_type = header
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .filter(|mime| !mime.is_empty())
            .unwrap_or(DEFAULT_MIME_TYPE);

        Self {
            data: payload.to_string(),
            mime_type: mime_type.to_string(),
        }
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn decode_bytes(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(&self.data)
            .map_err(|e| StudioError::InvalidImage(e.to_string()))
    }
}

/// MIME type for a local image file, by extension
pub fn mime_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}
