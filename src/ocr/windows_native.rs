//! Native-platform backend: Windows.Media.Ocr via WinRT.
//!
//! WinRT OCR objects are apartment-bound and not `Send`, so everything
//! is created per call inside `spawn_blocking`; initialization just
//! proves an engine can be created for the user's profile languages.

use super::{BackendKind, OcrBackend, RecognizedPayload};
use crate::capture::CapturedImage;
use crate::error::BackendFailure;
use async_trait::async_trait;
use windows::Graphics::Imaging::BitmapDecoder;
use windows::Media::Ocr::OcrEngine;
use windows::Storage::Streams::{DataWriter, InMemoryRandomAccessStream};

pub struct WindowsNativeBackend;

impl WindowsNativeBackend {
    pub fn new() -> Self {
        Self
    }
}

fn recognize_png(png: &[u8]) -> windows::core::Result<String> {
    let stream = InMemoryRandomAccessStream::new()?;
    let writer = DataWriter::CreateDataWriter(&stream)?;
    writer.WriteBytes(png)?;
    writer.StoreAsync()?.get()?;
    writer.FlushAsync()?.get()?;
    writer.DetachStream()?;
    stream.Seek(0)?;

    let decoder = BitmapDecoder::CreateAsync(&stream)?.get()?;
    let bitmap = decoder.GetSoftwareBitmapAsync()?.get()?;

    let engine = OcrEngine::TryCreateFromUserProfileLanguages()?;
    let result = engine.RecognizeAsync(&bitmap)?.get()?;

    let mut text = String::new();
    for line in result.Lines()? {
        text.push_str(&line.Text()?.to_string());
        text.push('\n');
    }
    Ok(text)
}

#[async_trait]
impl OcrBackend for WindowsNativeBackend {
    fn name(&self) -> &'static str {
        "windows-ocr"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::WindowsNative
    }

    async fn initialize(&self) -> Result<(), BackendFailure> {
        tokio::task::spawn_blocking(|| {
            OcrEngine::TryCreateFromUserProfileLanguages()
                .map(|_| ())
                .map_err(|e| BackendFailure::Init(format!("OcrEngine unavailable: {e}")))
        })
        .await
        .map_err(|e| BackendFailure::Init(format!("init task panicked: {e}")))?
    }

    async fn recognize(&self, image: &CapturedImage) -> Result<RecognizedPayload, BackendFailure> {
        let png = image.png.clone();
        let text = tokio::task::spawn_blocking(move || recognize_png(&png))
            .await
            .map_err(|e| BackendFailure::Recognition(format!("OCR task panicked: {e}")))?
            .map_err(|e| BackendFailure::Recognition(e.to_string()))?;
        Ok(RecognizedPayload::RawText(text))
    }
}
