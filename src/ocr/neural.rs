//! Local-neural backend: an EasyOCR-style sidecar process.
//!
//! The model runtime lives in a separate process so the heavy weights
//! load in its address space, not ours. Contract: the configured command
//! (`NEURAL_OCR_CMD`, default `easyocr-stdin`) reads one PNG on stdin
//! and writes the recognized text to stdout, one paragraph per line.

use super::{BackendKind, OcrBackend, RecognizedPayload};
use crate::capture::CapturedImage;
use crate::error::BackendFailure;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub struct NeuralBackend {
    program: String,
    args: Vec<String>,
}

impl NeuralBackend {
    /// `cmd` is a full command line; the first word is the program.
    pub fn new(cmd: &str) -> Self {
        let mut parts = cmd.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_default();
        Self { program, args: parts.collect() }
    }
}

#[async_trait]
impl OcrBackend for NeuralBackend {
    fn name(&self) -> &'static str {
        "easyocr"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Neural
    }

    async fn initialize(&self) -> Result<(), BackendFailure> {
        if self.program.is_empty() {
            return Err(BackendFailure::Init("NEURAL_OCR_CMD is empty".into()));
        }
        // Existence check only. The sidecar loads its model lazily on
        // first recognition, so a cold first run is expected to be slow.
        let path = which::which(&self.program)
            .map_err(|e| BackendFailure::Init(format!("{} not found: {e}", self.program)))?;
        log::info!("[OCR] Neural sidecar at {}", path.display());
        Ok(())
    }

    async fn recognize(&self, image: &CapturedImage) -> Result<RecognizedPayload, BackendFailure> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BackendFailure::Recognition(format!("spawn failed: {e}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| BackendFailure::Recognition("no stdin handle".into()))?;
        stdin
            .write_all(&image.png)
            .await
            .map_err(|e| BackendFailure::Recognition(format!("writing image failed: {e}")))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| BackendFailure::Recognition(format!("wait failed: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendFailure::Recognition(format!(
                "sidecar exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(RecognizedPayload::RawText(
            String::from_utf8_lossy(&output.stdout).into_owned(),
        ))
    }
}
