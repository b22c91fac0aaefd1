//! OCR domain — interchangeable recognition backends behind one contract.
//!
//! Backends:
//!   - neural.rs         — EasyOCR-style local sidecar process
//!   - tesseract.rs      — the tesseract executable, stdin → stdout
//!   - gemini_vision.rs  — Gemini multimodal, returns the extraction
//!                         schema directly (no separate extract stage)
//!   - windows_native.rs — Windows.Media.Ocr (Windows only)
//!
//! The registry owns per-backend lazy-initialization state; the gateway
//! (gateway.rs) owns selection, timeout, and fallback.

pub mod gateway;
pub mod gemini_vision;
pub mod neural;
pub mod tesseract;
#[cfg(target_os = "windows")]
pub mod windows_native;

pub use gateway::OcrGateway;

use crate::capture::CapturedImage;
use crate::config::OcrConfig;
use crate::error::BackendFailure;
use crate::llm::types::ExtractionResult;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// The configured backend variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Local neural OCR sidecar (EasyOCR-style).
    Neural,
    /// Local tesseract binary.
    Tesseract,
    /// Remote multimodal vision model.
    GeminiVision,
    /// Platform OCR (Windows.Media.Ocr).
    WindowsNative,
}

impl BackendKind {
    /// Accepts the engine names the original tool used plus the obvious
    /// aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "easyocr" | "neural" => Some(Self::Neural),
            "tesseract" | "pytesseract" => Some(Self::Tesseract),
            "gemini" | "gemini-vision" => Some(Self::GeminiVision),
            "oneocr" | "windows" | "windows-ocr" => Some(Self::WindowsNative),
            _ => None,
        }
    }
}

/// What a backend can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Plain recognized text; needs the extraction stage afterwards.
    RawText,
    /// The backend answers the "is this an MCQ" question itself and
    /// emits the extraction schema directly.
    Structured,
}

/// Output of one successful recognition, tagged by capability. The
/// pipeline branches on this to decide whether extraction is needed.
#[derive(Debug, Clone)]
pub enum RecognizedPayload {
    RawText(String),
    Structured(ExtractionResult),
}

/// Common recognition contract. Implementations must be cheap to
/// construct; all expensive work belongs in `initialize`, which the
/// registry memoizes.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn kind(&self) -> BackendKind;
    fn capability(&self) -> Capability {
        Capability::RawText
    }

    /// One-time setup (binary discovery, model load, key check). Called
    /// at most once per process; the outcome is cached, and a failure is
    /// permanent for the process lifetime.
    async fn initialize(&self) -> Result<(), BackendFailure>;

    async fn recognize(&self, image: &CapturedImage) -> Result<RecognizedPayload, BackendFailure>;

    /// Release resources that support explicit teardown. Default: none.
    async fn shutdown(&self) {}
}

/// One registry entry: the backend plus its memoized init outcome.
pub struct BackendSlot {
    backend: Box<dyn OcrBackend>,
    init: OnceCell<Result<(), BackendFailure>>,
}

impl BackendSlot {
    fn new(backend: Box<dyn OcrBackend>) -> Self {
        Self { backend, init: OnceCell::new() }
    }

    pub fn backend(&self) -> &dyn OcrBackend {
        self.backend.as_ref()
    }

    /// Initialize at most once. Concurrent callers share one attempt and
    /// observe the same outcome; a failure stays cached — no retry
    /// storms against a known-broken backend.
    pub async fn ensure_init(&self) -> Result<(), BackendFailure> {
        self.init
            .get_or_init(|| async {
                log::info!("[OCR] Initializing backend {}", self.backend.name());
                let started = std::time::Instant::now();
                let outcome = self.backend.initialize().await;
                match &outcome {
                    Ok(()) => log::info!(
                        "[OCR] Backend {} ready ({}ms)",
                        self.backend.name(),
                        started.elapsed().as_millis()
                    ),
                    Err(e) => log::error!(
                        "[OCR] Backend {} failed to initialize: {e} (permanent for this process)",
                        self.backend.name()
                    ),
                }
                outcome
            })
            .await
            .clone()
    }

    /// True once initialization has been attempted and failed.
    pub fn init_failed(&self) -> bool {
        matches!(self.init.get(), Some(Err(_)))
    }
}

/// Ordered set of configured backends and their shared init guards.
pub struct BackendRegistry {
    slots: Vec<Arc<BackendSlot>>,
}

impl BackendRegistry {
    pub fn new(backends: Vec<Box<dyn OcrBackend>>) -> Self {
        Self { slots: backends.into_iter().map(|b| Arc::new(BackendSlot::new(b))).collect() }
    }

    /// Build the concrete backends named by the config, in configured
    /// fallback order. Unbuildable entries (platform mismatch) are
    /// logged and dropped.
    pub fn from_config(config: &OcrConfig) -> Self {
        let mut backends: Vec<Box<dyn OcrBackend>> = Vec::new();
        for kind in &config.backends {
            match kind {
                BackendKind::Neural => {
                    backends.push(Box::new(neural::NeuralBackend::new(&config.neural_cmd)));
                }
                BackendKind::Tesseract => {
                    backends.push(Box::new(tesseract::TesseractBackend::new(
                        config.tesseract_cmd.clone(),
                    )));
                }
                BackendKind::GeminiVision => {
                    backends.push(Box::new(gemini_vision::GeminiVisionBackend::new(
                        config.gemini_api_key.clone(),
                    )));
                }
                BackendKind::WindowsNative => {
                    #[cfg(target_os = "windows")]
                    backends.push(Box::new(windows_native::WindowsNativeBackend::new()));
                    #[cfg(not(target_os = "windows"))]
                    log::warn!("[OCR] windows-ocr requested but this is not Windows — skipping");
                }
            }
        }
        Self::new(backends)
    }

    /// Preferred backend first, then the remaining configured backends in
    /// fallback order. Never mutates backend state.
    pub fn resolve(&self, preferred: Option<BackendKind>) -> Vec<Arc<BackendSlot>> {
        let mut ordered: Vec<Arc<BackendSlot>> = Vec::with_capacity(self.slots.len());
        if let Some(kind) = preferred {
            ordered.extend(self.slots.iter().filter(|s| s.backend.kind() == kind).cloned());
        }
        ordered.extend(
            self.slots
                .iter()
                .filter(|s| Some(s.backend.kind()) != preferred)
                .cloned(),
        );
        ordered
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Tear down every backend that was actually initialized.
    pub async fn shutdown_all(&self) {
        for slot in &self.slots {
            if matches!(slot.init.get(), Some(Ok(()))) {
                slot.backend.shutdown().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBackend {
        kind: BackendKind,
        init_calls: Arc<AtomicUsize>,
        fail_init: bool,
    }

    #[async_trait]
    impl OcrBackend for CountingBackend {
        fn name(&self) -> &'static str {
            "counting"
        }
        fn kind(&self) -> BackendKind {
            self.kind
        }
        async fn initialize(&self) -> Result<(), BackendFailure> {
            self.init_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_init {
                Err(BackendFailure::Init("broken".into()))
            } else {
                Ok(())
            }
        }
        async fn recognize(
            &self,
            _image: &CapturedImage,
        ) -> Result<RecognizedPayload, BackendFailure> {
            Ok(RecognizedPayload::RawText("text".into()))
        }
    }

    fn counting(kind: BackendKind, fail_init: bool) -> (Box<dyn OcrBackend>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = CountingBackend { kind, init_calls: calls.clone(), fail_init };
        (Box::new(backend), calls)
    }

    #[tokio::test]
    async fn init_runs_once_across_concurrent_callers() {
        let (backend, calls) = counting(BackendKind::Tesseract, false);
        let registry = Arc::new(BackendRegistry::new(vec![backend]));
        let slot = registry.resolve(None).remove(0);

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let slot = slot.clone();
            tasks.push(tokio::spawn(async move { slot.ensure_init().await }));
        }
        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn init_failure_is_memoized() {
        let (backend, calls) = counting(BackendKind::Neural, true);
        let registry = BackendRegistry::new(vec![backend]);
        let slot = registry.resolve(None).remove(0);

        assert!(slot.ensure_init().await.is_err());
        assert!(slot.ensure_init().await.is_err());
        assert!(slot.init_failed());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resolve_puts_preferred_first_without_reordering_the_rest() {
        let (a, _) = counting(BackendKind::Neural, false);
        let (b, _) = counting(BackendKind::Tesseract, false);
        let (c, _) = counting(BackendKind::GeminiVision, false);
        let registry = BackendRegistry::new(vec![a, b, c]);

        let order: Vec<BackendKind> = registry
            .resolve(Some(BackendKind::GeminiVision))
            .iter()
            .map(|s| s.backend().kind())
            .collect();
        assert_eq!(
            order,
            vec![BackendKind::GeminiVision, BackendKind::Neural, BackendKind::Tesseract]
        );
    }
}
