//! OCR gateway — selection, bounded timeout, and fallback.
//!
//! Tries backends in resolve order until one produces usable output.
//! Per-backend failures are logged and recorded in the run log but never
//! surface to the UI unless every backend fails.

use super::{BackendKind, BackendRegistry, RecognizedPayload};
use crate::cancel::CancelToken;
use crate::capture::CapturedImage;
use crate::error::{BackendFailure, OcrError};
use crate::runlog::RunLog;
use std::sync::Arc;
use std::time::Duration;

pub struct OcrGateway {
    registry: Arc<BackendRegistry>,
    preferred: Option<BackendKind>,
    timeout: Duration,
    runlog: Arc<RunLog>,
}

impl OcrGateway {
    pub fn new(
        registry: Arc<BackendRegistry>,
        preferred: Option<BackendKind>,
        timeout: Duration,
        runlog: Arc<RunLog>,
    ) -> Self {
        Self { registry, preferred, timeout, runlog }
    }

    /// Produce text (or a structured payload) from the captured image.
    ///
    /// First success wins; no further backends are tried. Empty
    /// recognized text counts as a failure and falls through. If every
    /// backend fails, the aggregate error carries each reason in
    /// fallback order.
    pub async fn recognize(
        &self,
        image: &CapturedImage,
        cancel: &CancelToken,
    ) -> Result<RecognizedPayload, OcrError> {
        let mut failures: Vec<(String, BackendFailure)> = Vec::new();

        for slot in self.registry.resolve(self.preferred) {
            if cancel.is_cancelled() {
                break;
            }
            let name = slot.backend().name();

            if slot.init_failed() {
                log::debug!("[OCR] {name} has a cached initialization failure");
            }
            if let Err(failure) = slot.ensure_init().await {
                self.record_attempt(name, image, &format!("FAILED: {failure}"));
                failures.push((name.to_string(), failure));
                continue;
            }

            log::info!("[OCR] Recognizing with {name}");
            let started = std::time::Instant::now();
            let attempt = tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = tokio::time::timeout(self.timeout, slot.backend().recognize(image)) => outcome,
            };

            let failure = match attempt {
                Err(_elapsed) => {
                    log::warn!("[OCR] {name} timed out after {}s", self.timeout.as_secs());
                    BackendFailure::Timeout(self.timeout.as_secs())
                }
                Ok(Err(failure)) => {
                    log::warn!("[OCR] {name} failed: {failure}");
                    failure
                }
                Ok(Ok(RecognizedPayload::RawText(text))) if text.trim().is_empty() => {
                    log::warn!("[OCR] {name} returned no text");
                    BackendFailure::Recognition("recognized no text".into())
                }
                Ok(Ok(payload)) => {
                    log::info!(
                        "[OCR] {name} succeeded in {}ms",
                        started.elapsed().as_millis()
                    );
                    self.record_attempt(name, image, &payload_preview(&payload));
                    if !failures.is_empty() {
                        log::info!(
                            "[OCR] Fallback recovered after {} failed backend(s)",
                            failures.len()
                        );
                    }
                    return Ok(payload);
                }
            };
            self.record_attempt(name, image, &format!("FAILED: {failure}"));
            failures.push((name.to_string(), failure));
        }

        Err(OcrError::AllBackendsFailed(failures))
    }

    fn record_attempt(&self, backend: &str, image: &CapturedImage, output: &str) {
        self.runlog.record(
            &format!("ocr:{backend}"),
            &format!("{}x{} PNG ({} bytes)", image.width, image.height, image.png.len()),
            output,
        );
    }
}

fn payload_preview(payload: &RecognizedPayload) -> String {
    match payload {
        RecognizedPayload::RawText(text) => {
            let preview: String = text.chars().take(200).collect();
            format!("text ({} chars): {preview}", text.len())
        }
        RecognizedPayload::Structured(result) => {
            format!("structured: {}", serde_json::to_string(result).unwrap_or_default())
        }
    }
}
