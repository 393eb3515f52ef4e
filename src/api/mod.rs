mod types;

use async_trait::async_trait;
use std::time::Duration;

pub use types::*;

use crate::config::Config;
use crate::core::error::Result;
use crate::core::{EncodedImage, ImageAsset, ImageGenerator, StudioError};
use crate::http_client::HTTP_CLIENT;

const UNKNOWN_API_ERROR: &str = "An unknown error occurred while contacting the image API.";

/// Gemini API client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    model: String,
    timeout: Option<Duration>,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            timeout: None,
        }
    }

    /// Create a new client from config
    pub fn from_config(config: &Config) -> Result<Self, StudioError> {
        let api_key = config.api_key().ok_or(StudioError::MissingApiKey)?;

        let mut client = Self::new(api_key, &config.api.base_url, &config.api.model);
        client.timeout = config.api.timeout_secs.map(Duration::from_secs);
        Ok(client)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one generateContent request with the prompt and both images
    pub async fn generate(
        &self,
        prompt: &str,
        base: &EncodedImage,
        reference: &EncodedImage,
    ) -> Result<GenerateResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = build_generate_request(prompt, base, reference);

        tracing::debug!("Sending generate request to: {}", url);
        tracing::debug!(
            "Payload sizes: base={} ({}), reference={} ({})",
            base.data.len(),
            base.mime_type,
            reference.data.len(),
            reference.mime_type
        );

        let mut builder = HTTP_CLIENT
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!("Response status: {}", status);

        if !status.is_success() {
            return Err(StudioError::ApiError {
                message: api_error_message(&body),
                source: None,
            });
        }

        serde_json::from_str(&body).map_err(|e| StudioError::ApiError {
            message: format!("Failed to parse Gemini API response: {}", e),
            source: None,
        })
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate_one(
        &self,
        prompt: &str,
        base: &ImageAsset,
        reference: &ImageAsset,
    ) -> Result<String> {
        let base = base.encode().await?;
        let reference = reference.encode().await?;

        let response = self.generate(prompt, &base, &reference).await?;
        extract_image(response)
    }
}

/// Build the API request body: prompt first, then base, then reference
fn build_generate_request(
    prompt: &str,
    base: &EncodedImage,
    reference: &EncodedImage,
) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![
                ContentPart::text(prompt),
                ContentPart::inline(&base.mime_type, &base.data),
                ContentPart::inline(&reference.mime_type, &reference.data),
            ],
            role: None,
        }],
        generation_config: Some(GenerationConfig::image_only()),
    }
}

/// First inline image of the response as a data URI
pub fn extract_image(response: GenerateResponse) -> Result<String> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        tracing::warn!("Prompt blocked: {}", reason);
    }

    // Only the first candidate is considered
    let Some(candidate) = response.candidates.and_then(|c| c.into_iter().next()) else {
        return Err(StudioError::NoImageReturned);
    };

    if let Some(reason) = &candidate.finish_reason {
        if reason != "STOP" && reason != "MAX_TOKENS" {
            tracing::warn!(
                "Generation finished with {}: {}",
                reason,
                candidate.finish_message.as_deref().unwrap_or("no message")
            );
        }
    }

    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        match part {
            ContentPart::InlineData { inline_data } => {
                let image = EncodedImage {
                    data: inline_data.data,
                    mime_type: inline_data.mime_type,
                };
                return Ok(image.to_data_uri());
            }
            ContentPart::Text { text } => {
                tracing::debug!("Response text: {}", text);
            }
            ContentPart::Other(_) => {}
        }
    }

    Err(StudioError::NoImageReturned)
}

/// Error text from a non-success body, falling back to the raw body
fn api_error_message(body: &str) -> String {
    if let Ok(ApiErrorBody { error }) = serde_json::from_str::<ApiErrorBody>(body) {
        tracing::debug!("API error {} ({})", error.code, error.status);
        if !error.message.is_empty() {
            return error.message;
        }
        if !error.status.is_empty() {
            return format!("{} (HTTP {})", error.status, error.code);
        }
    }
    let body = body.trim();
    if body.is_empty() {
        UNKNOWN_API_ERROR.to_string()
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{generate_variations, BATCH_SIZE};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENDPOINT: &str = "/models/gemini-2.5-flash-image:generateContent";

    fn test_client(server: &MockServer) -> GeminiClient {
        GeminiClient::new("test-key", server.uri(), "gemini-2.5-flash-image")
    }

    fn pair() -> (ImageAsset, ImageAsset) {
        (
            ImageAsset::from_data_uri("data:image/png;base64,YmFzZQ=="),
            ImageAsset::from_data_uri("data:image/webp;base64,cmVm"),
        )
    }

    fn image_response(mime: &str, data: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "Here is your image" },
                        { "inlineData": { "mimeType": mime, "data": data } }
                    ]
                },
                "finishReason": "STOP"
            }]
        })
    }

    #[tokio::test]
    async fn generate_one_returns_first_image_as_data_uri() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "generationConfig": { "responseModalities": ["IMAGE"] }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(image_response("image/png", "b3V0")))
            .expect(1)
            .mount(&server)
            .await;

        let (base, reference) = pair();
        let image = test_client(&server)
            .generate_one("prompt", &base, &reference)
            .await
            .unwrap();

        assert_eq!(image, "data:image/png;base64,b3V0");
    }

    #[tokio::test]
    async fn request_carries_prompt_and_both_images_in_order() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .and(body_partial_json(json!({
                "contents": [{
                    "parts": [
                        { "text": "blend" },
                        { "inlineData": { "mimeType": "image/png", "data": "YmFzZQ==" } },
                        { "inlineData": { "mimeType": "image/webp", "data": "cmVm" } }
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(image_response("image/jpeg", "eA==")))
            .expect(1)
            .mount(&server)
            .await;

        let (base, reference) = pair();
        let image = test_client(&server)
            .generate_one("blend", &base, &reference)
            .await
            .unwrap();

        assert_eq!(image, "data:image/jpeg;base64,eA==");
    }

    #[tokio::test]
    async fn text_only_response_is_no_image_returned() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "I cannot do that" }] },
                    "finishReason": "IMAGE_SAFETY"
                }]
            })))
            .mount(&server)
            .await;

        let (base, reference) = pair();
        let err = test_client(&server)
            .generate_one("prompt", &base, &reference)
            .await
            .unwrap_err();

        assert!(matches!(err, StudioError::NoImageReturned));
    }

    #[tokio::test]
    async fn api_error_message_is_extracted() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "code": 400,
                    "message": "API key not valid. Please pass a valid API key.",
                    "status": "INVALID_ARGUMENT"
                }
            })))
            .mount(&server)
            .await;

        let (base, reference) = pair();
        let err = test_client(&server)
            .generate_one("prompt", &base, &reference)
            .await
            .unwrap_err();

        match err {
            StudioError::ApiError { message, .. } => {
                assert_eq!(message, "API key not valid. Please pass a valid API key.")
            }
            other => panic!("expected api error, got {:?}", other),
        }
    }

    #[test]
    fn error_status_is_used_when_message_is_blank() {
        let body = json!({
            "error": { "code": 429, "message": "", "status": "RESOURCE_EXHAUSTED" }
        })
        .to_string();

        assert_eq!(api_error_message(&body), "RESOURCE_EXHAUSTED (HTTP 429)");
        assert_eq!(api_error_message("upstream timeout\n"), "upstream timeout");
    }

    #[tokio::test]
    async fn empty_error_body_uses_fallback_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (base, reference) = pair();
        let err = test_client(&server)
            .generate_one("prompt", &base, &reference)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), format!("API error: {}", UNKNOWN_API_ERROR));
    }

    #[tokio::test]
    async fn batch_against_server_issues_four_requests() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(image_response("image/png", "b3V0")))
            .expect(BATCH_SIZE as u64)
            .mount(&server)
            .await;

        let (base, reference) = pair();
        let images = generate_variations(&test_client(&server), &base, &reference)
            .await
            .unwrap();

        assert_eq!(images.len(), BATCH_SIZE);
    }

    #[test]
    fn missing_key_fails_before_any_request() {
        let config = Config::default();
        assert!(matches!(
            GeminiClient::from_config(&config),
            Err(StudioError::MissingApiKey)
        ));
    }

    #[test]
    fn unknown_parts_are_skipped() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "functionCall": { "name": "x", "args": {} } },
                        { "inline_data": { "mime_type": "image/webp", "data": "d2VicA==" } }
                    ]
                }
            }]
        }))
        .unwrap();

        assert_eq!(
            extract_image(response).unwrap(),
            "data:image/webp;base64,d2VicA=="
        );
    }

    #[test]
    fn only_first_candidate_is_read() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [{ "text": "no image here" }] } },
                { "content": { "parts": [{ "inlineData": { "mimeType": "image/png", "data": "eA==" } }] } }
            ]
        }))
        .unwrap();

        assert!(matches!(
            extract_image(response),
            Err(StudioError::NoImageReturned)
        ));
    }

    #[test]
    fn empty_response_has_no_image() {
        let response: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            extract_image(response),
            Err(StudioError::NoImageReturned)
        ));
    }
}
