//! Lifecycle events emitted by the pipeline to the UI collaborator.
//!
//! Delivery is an unbounded mpsc channel: sends never block (so the
//! worker can emit while the consumer is busy, and `quit()` cannot
//! deadlock against a consumer mid-emit), and per-run emission order is
//! preserved — chunks are never reordered or dropped.

use crate::llm::types::ExtractionResult;
use tokio::sync::mpsc;

/// One pipeline lifecycle notification.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A run was accepted and is starting.
    Started,
    /// One ordered fragment of the streamed answer.
    Chunk(String),
    /// The extraction stage produced a validated result. Only emitted on
    /// the two-stage path; structured OCR backends skip it.
    ExtractionComplete(ExtractionResult),
    /// The run completed (including short-circuit completions).
    Finished,
    /// The run failed; the controller is back at idle.
    Error(String),
    /// Acknowledgment that `quit()` has unwound all outstanding work.
    Quit,
}

/// Sender half handed to the pipeline worker.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl EventSender {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit an event. A dropped receiver is not an error — the UI may
    /// have gone away while a run is unwinding.
    pub fn emit(&self, event: PipelineEvent) {
        if self.tx.send(event).is_err() {
            log::debug!("[PIPELINE] Event receiver dropped — discarding event");
        }
    }
}
