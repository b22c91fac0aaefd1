//! The capture-to-answer pipeline controller.
//!
//! A single-flight state machine: `trigger()` atomically claims the
//! controller, spawns one worker task that runs
//! capture → OCR → (extract) → answer, and forwards lifecycle events to
//! the UI collaborator. `quit()` cancels cooperatively, waits for the
//! worker to unwind, tears down backends, and is terminal.
//!
//! The triggering context never blocks on pipeline completion; all
//! suspension points (capture, backend init, inference, model calls)
//! live on the worker task.

use crate::cancel::{CancelSource, CancelToken};
use crate::capture::{CaptureSource, CapturedImage, ScreenCapture};
use crate::config::Config;
use crate::error::{CaptureError, PipelineError};
use crate::event::{EventSender, PipelineEvent};
use crate::llm::{AnsweringStage, ExtractionResult, ExtractionStage};
use crate::ocr::{BackendRegistry, OcrGateway, RecognizedPayload};
use crate::runlog::RunLog;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Where the active run currently is. `Idle` doubles as the
/// single-flight guard: `trigger()` only proceeds from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Capturing,
    Recognizing,
    Extracting,
    Answering,
}

pub struct Pipeline {
    inner: Arc<Inner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

struct Inner {
    phase: Mutex<Phase>,
    quitting: AtomicBool,
    cancel_source: CancelSource,
    cancel: CancelToken,
    events: EventSender,
    runtime: tokio::runtime::Handle,
    capture: Arc<dyn CaptureSource>,
    registry: Arc<BackendRegistry>,
    gateway: OcrGateway,
    extraction: ExtractionStage,
    answering: AnsweringStage,
    runlog: Arc<RunLog>,
}

impl Pipeline {
    /// Assemble a pipeline from pre-built parts. Must be called from
    /// within a tokio runtime; `trigger()` itself may then be called
    /// from any thread (e.g. a hotkey callback).
    pub fn new(
        capture: Arc<dyn CaptureSource>,
        registry: BackendRegistry,
        extraction: ExtractionStage,
        answering: AnsweringStage,
        runlog: RunLog,
        ocr_timeout: Duration,
    ) -> (Self, UnboundedReceiver<PipelineEvent>) {
        if registry.is_empty() {
            log::warn!("[PIPELINE] No OCR backends configured — every run will fail");
        }
        let (events, receiver) = EventSender::channel();
        let (cancel_source, cancel) = CancelSource::new();
        let registry = Arc::new(registry);
        let runlog = Arc::new(runlog);
        let gateway = OcrGateway::new(Arc::clone(&registry), None, ocr_timeout, Arc::clone(&runlog));

        let inner = Arc::new(Inner {
            phase: Mutex::new(Phase::Idle),
            quitting: AtomicBool::new(false),
            cancel_source,
            cancel,
            events,
            runtime: tokio::runtime::Handle::current(),
            capture,
            registry,
            gateway,
            extraction,
            answering,
            runlog,
        });
        (Self { inner, worker: Mutex::new(None) }, receiver)
    }

    /// Production assembly: real screen capture plus the backends, model
    /// endpoints, and run log named by the config.
    pub fn from_config(config: &Config) -> (Self, UnboundedReceiver<PipelineEvent>) {
        Self::new(
            Arc::new(ScreenCapture),
            BackendRegistry::from_config(&config.ocr),
            ExtractionStage::new(&config.extraction),
            AnsweringStage::new(&config.answering),
            RunLog::open(&config.run_log_path),
            Duration::from_secs(config.ocr.timeout_secs),
        )
    }

    /// Fire-and-forget trigger. A no-op (logged, not an error) while a
    /// run is active or after `quit()`; otherwise claims the controller
    /// and starts the worker task.
    pub fn trigger(&self) {
        // Hold the worker slot for the whole claim-and-spawn so quit()
        // can never slip between the phase claim and the handle store.
        let mut worker = self.worker.lock().unwrap();
        if self.inner.quitting.load(Ordering::Acquire) {
            log::info!("[PIPELINE] Quit in progress — ignoring trigger");
            return;
        }
        {
            let mut phase = self.inner.phase.lock().unwrap();
            if *phase != Phase::Idle {
                log::info!("[PIPELINE] Already processing ({:?}) — ignoring trigger", *phase);
                return;
            }
            *phase = Phase::Capturing;
        }

        log::info!("[PIPELINE] Trigger accepted — starting run");
        self.inner.events.emit(PipelineEvent::Started);
        let inner = Arc::clone(&self.inner);
        *worker = Some(self.inner.runtime.spawn(async move { Inner::run(inner).await }));
    }

    /// Cancel any in-flight run, wait for the worker to reach
    /// quiescence, release backend resources, then acknowledge with a
    /// `Quit` event. Idempotent; terminal — later triggers are rejected.
    pub async fn quit(&self) {
        if self.inner.quitting.swap(true, Ordering::AcqRel) {
            log::info!("[PIPELINE] Quit already requested");
            return;
        }
        log::info!("[PIPELINE] Quit — cancelling in-flight work");
        self.inner.cancel_source.cancel();

        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                log::warn!("[PIPELINE] Worker task did not unwind cleanly: {e}");
            }
        }

        self.inner.registry.shutdown_all().await;
        *self.inner.phase.lock().unwrap() = Phase::Idle;
        self.inner.events.emit(PipelineEvent::Quit);
        log::info!("[PIPELINE] Quit complete");
    }

    pub fn phase(&self) -> Phase {
        *self.inner.phase.lock().unwrap()
    }

    pub fn is_idle(&self) -> bool {
        self.phase() == Phase::Idle
    }
}

impl Inner {
    async fn run(inner: Arc<Inner>) {
        let started = std::time::Instant::now();
        let outcome = Self::run_stages(&inner).await;

        // Return to Idle before the terminal event so a consumer that
        // reacts to Finished/Error can re-trigger immediately.
        *inner.phase.lock().unwrap() = Phase::Idle;

        match outcome {
            Ok(()) if inner.cancel.is_cancelled() => {
                log::info!("[PIPELINE] Run cancelled after {}ms", started.elapsed().as_millis());
            }
            Ok(()) => {
                log::info!("[PIPELINE] Run complete in {}ms", started.elapsed().as_millis());
                inner.events.emit(PipelineEvent::Finished);
            }
            Err(e) if inner.cancel.is_cancelled() => {
                log::info!("[PIPELINE] Run unwound during quit: {e}");
            }
            Err(e) => {
                log::error!("[PIPELINE] Run failed: {e}");
                inner.events.emit(PipelineEvent::Error(e.to_string()));
            }
        }
    }

    async fn run_stages(inner: &Arc<Inner>) -> Result<(), PipelineError> {
        let cancel = inner.cancel.clone();

        // Capturing — platform call, blocking, off the async worker.
        let image = Self::capture(inner).await?;
        if cancel.is_cancelled() {
            return Ok(());
        }

        Self::set_phase(inner, Phase::Recognizing);
        let payload = inner.gateway.recognize(&image, &cancel).await?;
        drop(image); // snapshot is consumed; free it before the model calls
        if cancel.is_cancelled() {
            return Ok(());
        }

        let extraction = match payload {
            RecognizedPayload::RawText(text) => {
                Self::set_phase(inner, Phase::Extracting);
                let result = inner.extraction.extract(&text, &cancel).await?;
                inner.runlog.record(
                    "extract",
                    &text,
                    &serde_json::to_string(&result).unwrap_or_default(),
                );
                inner.events.emit(PipelineEvent::ExtractionComplete(result.clone()));
                result
            }
            RecognizedPayload::Structured(result) => {
                // Same invariant the extraction stage enforces; a
                // structured backend does not get to bypass it.
                result.validate().map_err(PipelineError::Extraction)?;
                log::info!("[PIPELINE] Structured OCR payload — skipping extraction stage");
                result
            }
        };
        if cancel.is_cancelled() {
            return Ok(());
        }

        Self::set_phase(inner, Phase::Answering);
        let events = inner.events.clone();
        let mut emit = |chunk: &str| events.emit(PipelineEvent::Chunk(chunk.to_string()));
        let outcome = inner.answering.answer(&extraction, &cancel, &mut emit).await;
        if cancel.is_cancelled() {
            return Ok(());
        }

        if !outcome.short_circuit {
            inner.runlog.record("answer", &answer_log_input(&extraction), &outcome.answer);
        }
        Ok(())
    }

    async fn capture(inner: &Arc<Inner>) -> Result<CapturedImage, CaptureError> {
        let capture = Arc::clone(&inner.capture);
        tokio::task::spawn_blocking(move || capture.capture())
            .await
            .map_err(|e| CaptureError(format!("capture task panicked: {e}")))?
    }

    fn set_phase(inner: &Arc<Inner>, phase: Phase) {
        log::debug!("[PIPELINE] → {phase:?}");
        *inner.phase.lock().unwrap() = phase;
    }
}

fn answer_log_input(extraction: &ExtractionResult) -> String {
    format!(
        "question: {}\nchoices:\n{}",
        extraction.question.as_deref().unwrap_or("<none>"),
        extraction
            .choices
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .map(|c| format!("- {c}"))
            .collect::<Vec<_>>()
            .join("\n")
    )
}
