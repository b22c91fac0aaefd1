//! Screen capture domain.
//!
//! The pipeline treats capture as an external collaborator behind the
//! [`CaptureSource`] trait: production uses [`ScreenCapture`] (full
//! primary-monitor grab via xcap), tests inject synthetic images.

use crate::error::CaptureError;
use image::DynamicImage;
use std::io::Cursor;

/// In-memory raster snapshot taken at trigger time. Owned exclusively by
/// the run that captured it; dropped after OCR consumes it.
#[derive(Clone)]
pub struct CapturedImage {
    /// PNG-encoded bytes — encoded once, in memory, no disk I/O.
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl CapturedImage {
    /// Encode a decoded image to the in-memory PNG form the backends eat.
    pub fn from_image(image: &DynamicImage) -> Result<Self, CaptureError> {
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| CaptureError(format!("PNG encode failed: {e}")))?;
        Ok(Self { png, width: image.width(), height: image.height() })
    }
}

impl std::fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("png_bytes", &self.png.len())
            .finish()
    }
}

/// Where snapshots come from. Blocking — the pipeline calls this under
/// `spawn_blocking` so the platform call never stalls the worker's
/// event handling.
pub trait CaptureSource: Send + Sync {
    fn capture(&self) -> Result<CapturedImage, CaptureError>;
}

/// Full-screen grab of the primary monitor.
pub struct ScreenCapture;

impl CaptureSource for ScreenCapture {
    fn capture(&self) -> Result<CapturedImage, CaptureError> {
        let start = std::time::Instant::now();
        let monitors = xcap::Monitor::all().map_err(|e| CaptureError(e.to_string()))?;
        let monitor = monitors
            .iter()
            .find(|m| m.is_primary().unwrap_or(false))
            .or_else(|| monitors.first())
            .ok_or_else(|| CaptureError("no monitors found".into()))?;
        let rgba = monitor
            .capture_image()
            .map_err(|e| CaptureError(format!("monitor capture failed: {e}")))?;
        let image = CapturedImage::from_image(&DynamicImage::ImageRgba8(rgba))?;
        log::info!(
            "[CAPTURE] {}x{} grabbed and PNG-encoded in {}ms ({} bytes)",
            image.width,
            image.height,
            start.elapsed().as_millis(),
            image.png.len()
        );
        Ok(image)
    }
}
