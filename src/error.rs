//! Error taxonomy for the capture-to-answer pipeline.
//!
//! Every stage failure is caught at its stage boundary and converted to a
//! single `Error` event; nothing here ever escapes past the controller to
//! the trigger or UI context.

use thiserror::Error;

/// Platform screen capture failed. Fatal to the run, not the process.
#[derive(Debug, Error)]
#[error("screen capture failed: {0}")]
pub struct CaptureError(pub String);

/// Why one OCR backend attempt failed. Kept cloneable so the memoized
/// init outcome can be handed to every later caller.
#[derive(Debug, Clone, Error)]
pub enum BackendFailure {
    #[error("initialization failed: {0}")]
    Init(String),
    #[error("timed out after {0}s")]
    Timeout(u64),
    #[error("recognition failed: {0}")]
    Recognition(String),
}

/// OCR gateway errors. Individual backend failures stay internal to the
/// fallback loop (as `BackendFailure`s); only the aggregate surfaces.
#[derive(Debug, Error)]
pub enum OcrError {
    /// Every configured backend failed. Carries the per-backend reasons
    /// so the log can say why, in fallback order.
    #[error("all OCR backends failed: {}", format_failures(.0))]
    AllBackendsFailed(Vec<(String, BackendFailure)>),
}

fn format_failures(failures: &[(String, BackendFailure)]) -> String {
    failures
        .iter()
        .map(|(name, f)| format!("{name}: {f}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Extraction stage errors. A syntactically valid response that violates
/// the extraction invariant is `InvalidStructure`, never coerced to a
/// "question not found" result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("extraction model did not return valid JSON: {0}")]
    MalformedOutput(String),

    #[error("extraction result has invalid structure: field '{0}'")]
    InvalidStructure(&'static str),

    #[error("extraction request failed: {0}")]
    Transport(String),
}

/// Answering stage errors. A mid-stream failure retains the partial
/// output already emitted and surfaces as an inline chunk, not a run
/// failure.
#[derive(Debug, Clone, Error)]
pub enum AnsweringError {
    #[error("answer stream transport failure: {0}")]
    TransportFailure(String),
}

/// Top-level run failure, emitted to the UI as one `Error` event.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}
