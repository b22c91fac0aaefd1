//! EXTRACT stage — raw OCR text in, validated `ExtractionResult` out.
//!
//! One non-streaming call to the cheaper model with
//! `response_format: json_object`. No retry: a malformed or
//! invariant-violating response fails the run, and the user re-triggers.

use super::prompts::EXTRACTION_SYSTEM_PROMPT;
use super::streaming::strip_code_fences;
use super::types::ExtractionResult;
use super::ModelClient;
use crate::cancel::CancelToken;
use crate::config::ModelConfig;
use crate::error::ExtractionError;

pub struct ExtractionStage {
    client: ModelClient,
}

impl ExtractionStage {
    pub fn new(config: &ModelConfig) -> Self {
        Self { client: ModelClient::new(config) }
    }

    /// Send the OCR text to the extraction model and parse + validate the
    /// JSON it returns.
    pub async fn extract(
        &self,
        text: &str,
        cancel: &CancelToken,
    ) -> Result<ExtractionResult, ExtractionError> {
        log::info!(
            "[LLM] Extracting with {} ({} chars of OCR text)",
            self.client.model,
            text.len()
        );
        let start = std::time::Instant::now();

        let body = serde_json::json!({
            "model": self.client.model,
            "messages": [
                {"role": "system", "content": EXTRACTION_SYSTEM_PROMPT},
                {"role": "user", "content": text}
            ],
            "response_format": {"type": "json_object"}
        });

        let request = self.client.post_completions(&body).send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(ExtractionError::Transport("cancelled".into())),
            result = request => result.map_err(|e| ExtractionError::Transport(e.to_string()))?,
        };

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            log::error!("[LLM] Extraction API returned {status}: {detail}");
            return Err(ExtractionError::Transport(format!("API returned {status}")));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ExtractionError::Transport(e.to_string()))?;
        log::info!("[LLM] Extraction round trip: {}ms", start.elapsed().as_millis());

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ExtractionError::MalformedOutput("response had no message content".into()))?;

        Self::parse_content(content)
    }

    /// Parse model output into the schema and enforce its invariant.
    /// Shared with the structured vision backend, which emits the same
    /// schema.
    pub fn parse_content(content: &str) -> Result<ExtractionResult, ExtractionError> {
        let json_str = strip_code_fences(content);
        let result: ExtractionResult = serde_json::from_str(&json_str)
            .map_err(|e| ExtractionError::MalformedOutput(e.to_string()))?;
        result.validate()?;
        log::info!(
            "[LLM] Extraction result: question_found={}, choices={}",
            result.question_found,
            result.choices.as_ref().map_or(0, Vec::len)
        );
        Ok(result)
    }
}
