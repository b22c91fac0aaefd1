//! LLM domain — the two-stage extract/answer pipeline.
//!
//! Both stages speak the OpenAI-compatible chat-completions protocol:
//!   - extract.rs — cheaper model, single JSON-constrained round trip
//!   - answer.rs  — smarter model, streaming SSE
//!
//! Shared:
//!   - streaming.rs — SSE buffering + delta/fence helpers
//!   - prompts.rs   — prompt constants and builders
//!   - types.rs     — the extraction schema + its invariant

pub mod answer;
pub mod extract;
pub mod prompts;
pub mod streaming;
pub mod types;

pub use answer::{AnswerOutcome, AnsweringStage};
pub use extract::ExtractionStage;
pub use types::ExtractionResult;

use crate::config::ModelConfig;

/// One OpenAI-compatible chat endpoint: shared HTTP client plus the
/// key/base/model triple for a configured model.
#[derive(Clone)]
pub struct ModelClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    pub model: String,
}

impl ModelClient {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        }
    }

    /// POST a chat-completions body with auth headers attached.
    pub(crate) fn post_completions(&self, body: &serde_json::Value) -> reqwest::RequestBuilder {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        self.http
            .post(url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(body)
    }
}
