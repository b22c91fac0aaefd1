//! Remote-vision backend: Gemini multimodal via the Google AI API.
//!
//! The one structured backend: instead of returning raw text for the
//! extraction stage, it is prompted to read the screenshot and emit the
//! extraction schema directly, so the pipeline skips a model round trip.
//!
//! API quirks (same as the other Gemini integrations here):
//! - API key in a URL query param, not a header
//! - `responseMimeType: "application/json"` enforces valid JSON

use super::{BackendKind, Capability, OcrBackend, RecognizedPayload};
use crate::capture::CapturedImage;
use crate::error::BackendFailure;
use crate::llm::prompts::VISION_EXTRACTION_PROMPT;
use crate::llm::ExtractionStage;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

pub const GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const GEMINI_MAX_TOKENS: u32 = 512;
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiVisionBackend {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl GeminiVisionBackend {
    pub fn new(api_key: Option<String>) -> Self {
        Self { http: reqwest::Client::new(), api_key }
    }

    fn key(&self) -> Result<&str, BackendFailure> {
        self.api_key
            .as_deref()
            .ok_or_else(|| BackendFailure::Recognition("backend not initialized".into()))
    }
}

#[async_trait]
impl OcrBackend for GeminiVisionBackend {
    fn name(&self) -> &'static str {
        "gemini-vision"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::GeminiVision
    }

    fn capability(&self) -> Capability {
        Capability::Structured
    }

    async fn initialize(&self) -> Result<(), BackendFailure> {
        match &self.api_key {
            Some(key) if !key.is_empty() => Ok(()),
            _ => Err(BackendFailure::Init("GEMINI_API_KEY not set".into())),
        }
    }

    async fn recognize(&self, image: &CapturedImage) -> Result<RecognizedPayload, BackendFailure> {
        let url = format!(
            "{API_BASE}/models/{GEMINI_MODEL}:generateContent?key={}",
            self.key()?
        );

        let body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {"text": VISION_EXTRACTION_PROMPT},
                    {"inline_data": {
                        "mime_type": "image/png",
                        "data": BASE64.encode(&image.png),
                    }}
                ]
            }],
            "generationConfig": {
                "maxOutputTokens": GEMINI_MAX_TOKENS,
                "temperature": 0.1,
                "responseMimeType": "application/json"
            }
        });

        let response = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendFailure::Recognition(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendFailure::Recognition(format!(
                "Gemini API returned {status}: {detail}"
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BackendFailure::Recognition(e.to_string()))?;
        let content = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| {
                BackendFailure::Recognition("response had no candidate text".into())
            })?;

        // Same schema + invariant as the extraction stage. A violating
        // response is a backend failure, so the gateway falls back to
        // the next backend rather than failing the run here.
        let result = ExtractionStage::parse_content(content)
            .map_err(|e| BackendFailure::Recognition(e.to_string()))?;
        Ok(RecognizedPayload::Structured(result))
    }
}
