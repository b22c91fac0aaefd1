//! quiz-glass — capture the screen, spot a multiple-choice question,
//! stream back an AI answer.
//!
//! The crate is the capture-to-answer pipeline only. Window chrome,
//! hotkey registration, and rendering belong to the embedding
//! application, which calls [`pipeline::Pipeline::trigger`] /
//! [`pipeline::Pipeline::quit`] and consumes [`event::PipelineEvent`]s
//! from the channel handed back at construction.
//!
//! Domains:
//!   - capture/  — screen snapshot behind the `CaptureSource` seam
//!   - ocr/      — pluggable recognition backends + fallback gateway
//!   - llm/      — extract (cheaper model) and answer (smarter model,
//!                 streaming) stages
//!   - pipeline  — the single-flight controller tying it together

pub mod cancel;
pub mod capture;
pub mod config;
pub mod error;
pub mod event;
pub mod llm;
pub mod ocr;
pub mod pipeline;
pub mod runlog;

pub use config::Config;
pub use event::PipelineEvent;
pub use llm::ExtractionResult;
pub use pipeline::Pipeline;
