//! ANSWER stage — stream a concise answer + explanation for a validated
//! extraction.
//!
//! Streams the smarter model over SSE and forwards every text fragment
//! the moment it arrives, in receipt order. A transport failure
//! mid-stream keeps the partial output already emitted and appends one
//! inline error chunk — answering problems never fail the run.

use super::prompts::{
    build_answer_context, build_answer_prompt, ANSWERING_SYSTEM_PROMPT, ANSWER_MAX_TOKENS,
};
use super::streaming;
use super::types::ExtractionResult;
use super::ModelClient;
use crate::cancel::CancelToken;
use crate::config::ModelConfig;
use crate::error::AnsweringError;

/// Fixed chunk when extraction found no question. A short-circuit
/// completion, not an error.
pub const NO_QUESTION_MESSAGE: &str = "Didn't find any questions.";
/// Fixed chunk when a question was flagged but its details are unusable.
pub const MISSING_DETAILS_MESSAGE: &str = "Found question but couldn't extract details.";

/// What one answering pass produced.
pub struct AnswerOutcome {
    /// Concatenation of every emitted chunk, in emission order.
    pub answer: String,
    /// True when the stage terminated without calling the model.
    pub short_circuit: bool,
    /// Transport failure, if the stream broke. Partial output above is
    /// still valid.
    pub failure: Option<AnsweringError>,
}

pub struct AnsweringStage {
    client: ModelClient,
}

impl AnsweringStage {
    pub fn new(config: &ModelConfig) -> Self {
        Self { client: ModelClient::new(config) }
    }

    /// Stream the answer, forwarding each fragment through `emit`.
    /// Finite and not restartable; cancellation stops emission between
    /// fragments.
    pub async fn answer(
        &self,
        extraction: &ExtractionResult,
        cancel: &CancelToken,
        emit: &mut (dyn FnMut(&str) + Send),
    ) -> AnswerOutcome {
        if !extraction.question_found {
            log::info!("[LLM] No question found — skipping the answering call");
            emit(NO_QUESTION_MESSAGE);
            return short_circuit(NO_QUESTION_MESSAGE);
        }
        let (Some(question), Some(choices)) = (&extraction.question, &extraction.choices) else {
            log::warn!("[LLM] Question flagged but details missing — skipping the answering call");
            emit(MISSING_DETAILS_MESSAGE);
            return short_circuit(MISSING_DETAILS_MESSAGE);
        };

        log::info!("[LLM] Answering with {} (streaming)", self.client.model);
        log::info!("[LLM] Question: {question}");
        let start = std::time::Instant::now();

        let body = serde_json::json!({
            "model": self.client.model,
            "messages": [
                {"role": "system", "content": build_answer_context(question, choices)},
                {"role": "system", "content": ANSWERING_SYSTEM_PROMPT},
                {"role": "user", "content": build_answer_prompt(question, choices)}
            ],
            "stream": true,
            "max_tokens": ANSWER_MAX_TOKENS
        });

        let request = self.client.post_completions(&body).send();
        let mut response = tokio::select! {
            _ = cancel.cancelled() => {
                log::info!("[LLM] Answer request cancelled before send completed");
                return AnswerOutcome { answer: String::new(), short_circuit: false, failure: None };
            }
            result = request => match result {
                Ok(resp) => resp,
                Err(e) => return self.transport_failed(e.to_string(), String::new(), emit),
            },
        };

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            log::error!("[LLM] Answering API returned {status}: {detail}");
            return self.transport_failed(format!("API returned {status}"), String::new(), emit);
        }
        log::info!("[LLM] TTFB: {}ms", start.elapsed().as_millis());

        let mut answer = String::new();
        let mut sse_buffer = String::new();
        let mut first_chunk_seen = false;
        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => {
                    log::info!("[LLM] Answer stream cancelled mid-flight");
                    return AnswerOutcome { answer, short_circuit: false, failure: None };
                }
                chunk = response.chunk() => chunk,
            };
            match chunk {
                Ok(Some(bytes)) => {
                    sse_buffer.push_str(&String::from_utf8_lossy(&bytes));
                    for data in streaming::parse_data_only_sse_events(&mut sse_buffer) {
                        if streaming::is_done_sentinel(&data) {
                            continue;
                        }
                        if let Some(delta) = streaming::extract_chat_delta(&data) {
                            if !first_chunk_seen && !delta.is_empty() {
                                log::info!("[LLM] TTFT: {}ms", start.elapsed().as_millis());
                                first_chunk_seen = true;
                            }
                            answer.push_str(&delta);
                            emit(&delta);
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => return self.transport_failed(e.to_string(), answer, emit),
            }
        }

        log::info!(
            "[LLM] Answer stream complete: {}ms, {} chars",
            start.elapsed().as_millis(),
            answer.len()
        );
        AnswerOutcome { answer, short_circuit: false, failure: None }
    }

    /// Append the inline error chunk and wrap up; the partially streamed
    /// answer is retained, not retracted.
    fn transport_failed(
        &self,
        reason: String,
        partial: String,
        emit: &mut (dyn FnMut(&str) + Send),
    ) -> AnswerOutcome {
        log::error!("[LLM] Answer stream failed: {reason}");
        let failure = AnsweringError::TransportFailure(reason);
        let inline = format!("Error during answering: {failure}");
        emit(&inline);
        AnswerOutcome {
            answer: partial + &inline,
            short_circuit: false,
            failure: Some(failure),
        }
    }
}

fn short_circuit(message: &str) -> AnswerOutcome {
    AnswerOutcome { answer: message.to_string(), short_circuit: true, failure: None }
}
