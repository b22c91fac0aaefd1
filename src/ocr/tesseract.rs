//! Local-binary backend: the tesseract executable in stdin → stdout mode.
//!
//! Discovery order: `TESSERACT_CMD` override, then `which tesseract`.
//! Initialization runs `--version` once to prove the binary actually
//! executes; recognition pipes the PNG through without touching disk.

use super::{BackendKind, OcrBackend, RecognizedPayload};
use crate::capture::CapturedImage;
use crate::error::BackendFailure;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub struct TesseractBackend {
    cmd_override: Option<String>,
    resolved: OnceLock<PathBuf>,
}

impl TesseractBackend {
    pub fn new(cmd_override: Option<String>) -> Self {
        Self { cmd_override, resolved: OnceLock::new() }
    }

    fn binary(&self) -> Result<&PathBuf, BackendFailure> {
        self.resolved
            .get()
            .ok_or_else(|| BackendFailure::Recognition("backend not initialized".into()))
    }
}

#[async_trait]
impl OcrBackend for TesseractBackend {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Tesseract
    }

    async fn initialize(&self) -> Result<(), BackendFailure> {
        let path = match &self.cmd_override {
            Some(cmd) => PathBuf::from(cmd),
            None => which::which("tesseract")
                .map_err(|e| BackendFailure::Init(format!("tesseract not found: {e}")))?,
        };

        let output = Command::new(&path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| BackendFailure::Init(format!("failed to run {}: {e}", path.display())))?;
        if !output.status.success() {
            return Err(BackendFailure::Init(format!(
                "{} --version exited with {}",
                path.display(),
                output.status
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout);
        log::info!(
            "[OCR] tesseract at {}: {}",
            path.display(),
            version.lines().next().unwrap_or("unknown version")
        );
        let _ = self.resolved.set(path);
        Ok(())
    }

    async fn recognize(&self, image: &CapturedImage) -> Result<RecognizedPayload, BackendFailure> {
        let mut child = Command::new(self.binary()?)
            .args(["stdin", "stdout"])
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
        drop(stdin); // close the pipe so tesseract sees EOF

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| BackendFailure::Recognition(format!("wait failed: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendFailure::Recognition(format!(
                "exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(RecognizedPayload::RawText(
            String::from_utf8_lossy(&output.stdout).into_owned(),
        ))
    }
}
