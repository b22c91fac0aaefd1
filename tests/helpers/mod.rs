//! Shared test fixtures: scripted OCR backends, a synthetic capture
//! source, and an in-process OpenAI-compatible mock server so the
//! pipeline can be exercised end to end without network access.

use async_trait::async_trait;
use quiz_glass::capture::{CaptureSource, CapturedImage};
use quiz_glass::error::{BackendFailure, CaptureError};
use quiz_glass::event::PipelineEvent;
use quiz_glass::llm::types::ExtractionResult;
use quiz_glass::ocr::{BackendKind, Capability, OcrBackend, RecognizedPayload};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedReceiver;

// ── Scripted OCR backends ────────────────────────────────────────────

#[derive(Clone)]
pub enum FakeBehavior {
    Text(String),
    Structured(ExtractionResult),
    FailInit(String),
    FailRecognize(String),
    /// Never completes (until the gateway timeout or cancellation).
    Hang,
}

pub struct FakeBackend {
    name: &'static str,
    behavior: FakeBehavior,
    pub init_calls: Arc<AtomicUsize>,
    pub recognize_calls: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub fn new(name: &'static str, behavior: FakeBehavior) -> Self {
        Self {
            name,
            behavior,
            init_calls: Arc::new(AtomicUsize::new(0)),
            recognize_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counters survive the move into the registry.
    pub fn counters(&self) -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        (self.init_calls.clone(), self.recognize_calls.clone())
    }
}

#[async_trait]
impl OcrBackend for FakeBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn kind(&self) -> BackendKind {
        match self.behavior {
            FakeBehavior::Structured(_) => BackendKind::GeminiVision,
            _ => BackendKind::Tesseract,
        }
    }

    fn capability(&self) -> Capability {
        match self.behavior {
            FakeBehavior::Structured(_) => Capability::Structured,
            _ => Capability::RawText,
        }
    }

    async fn initialize(&self) -> Result<(), BackendFailure> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            FakeBehavior::FailInit(reason) => Err(BackendFailure::Init(reason.clone())),
            _ => Ok(()),
        }
    }

    async fn recognize(&self, _image: &CapturedImage) -> Result<RecognizedPayload, BackendFailure> {
        self.recognize_calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            FakeBehavior::Text(text) => Ok(RecognizedPayload::RawText(text.clone())),
            FakeBehavior::Structured(result) => Ok(RecognizedPayload::Structured(result.clone())),
            FakeBehavior::FailRecognize(reason) => {
                Err(BackendFailure::Recognition(reason.clone()))
            }
            FakeBehavior::FailInit(_) => unreachable!("recognize called on init-failing backend"),
            FakeBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(BackendFailure::Recognition("hang elapsed".into()))
            }
        }
    }
}

// ── Synthetic capture ────────────────────────────────────────────────

pub struct FakeCapture;

impl CaptureSource for FakeCapture {
    fn capture(&self) -> Result<CapturedImage, CaptureError> {
        CapturedImage::from_image(&image::DynamicImage::new_rgba8(8, 8))
    }
}

// ── Mock OpenAI-compatible server ────────────────────────────────────

/// Serves `POST */chat/completions`. Non-streaming requests get a
/// message whose content is `extraction_content`; streaming requests
/// get `answer_chunks` as SSE deltas (with `chunk_delay` between them)
/// followed by the `[DONE]` sentinel.
pub struct MockLlm {
    pub base_url: String,
}

impl MockLlm {
    pub async fn start(
        extraction_content: &str,
        answer_chunks: &[&str],
        chunk_delay: Duration,
    ) -> Self {
        Self::spawn(extraction_content, answer_chunks, chunk_delay, false).await
    }

    /// Like [`MockLlm::start`], but the streaming response uses chunked
    /// transfer encoding and the socket is dropped after the last delta
    /// without the terminating chunk or `[DONE]`, so the client sees a
    /// mid-stream transport error after receiving every delta.
    pub async fn start_truncating(
        extraction_content: &str,
        answer_chunks: &[&str],
        chunk_delay: Duration,
    ) -> Self {
        Self::spawn(extraction_content, answer_chunks, chunk_delay, true).await
    }

    async fn spawn(
        extraction_content: &str,
        answer_chunks: &[&str],
        chunk_delay: Duration,
        truncate_stream: bool,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");
        let extraction = extraction_content.to_string();
        let chunks: Vec<String> = answer_chunks.iter().map(|s| s.to_string()).collect();

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else { break };
                let extraction = extraction.clone();
                let chunks = chunks.clone();
                tokio::spawn(async move {
                    let _ =
                        serve_connection(stream, extraction, chunks, chunk_delay, truncate_stream)
                            .await;
                });
            }
        });

        Self { base_url: format!("http://{addr}/v1") }
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    extraction: String,
    chunks: Vec<String>,
    chunk_delay: Duration,
    truncate_stream: bool,
) -> std::io::Result<()> {
    let body = read_request_body(&mut stream).await?;

    if body.contains("\"stream\":true") {
        if truncate_stream {
            stream
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n",
                )
                .await?;
            for chunk in &chunks {
                let event =
                    serde_json::json!({"choices": [{"delta": {"content": chunk}, "index": 0}]});
                let frame = format!("data: {event}\n\n");
                stream
                    .write_all(format!("{:x}\r\n{frame}\r\n", frame.len()).as_bytes())
                    .await?;
                stream.flush().await?;
                if !chunk_delay.is_zero() {
                    tokio::time::sleep(chunk_delay).await;
                }
            }
            // Close without the terminating 0-length chunk: the client
            // gets every delta, then a transport error.
            return Ok(());
        }
        stream
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n",
            )
            .await?;
        for chunk in &chunks {
            let event = serde_json::json!({"choices": [{"delta": {"content": chunk}, "index": 0}]});
            stream.write_all(format!("data: {event}\n\n").as_bytes()).await?;
            stream.flush().await?;
            if !chunk_delay.is_zero() {
                tokio::time::sleep(chunk_delay).await;
            }
        }
        stream.write_all(b"data: [DONE]\n\n").await?;
    } else {
        let payload =
            serde_json::json!({"choices": [{"message": {"content": extraction}}]}).to_string();
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{payload}",
            payload.len()
        );
        stream.write_all(response.as_bytes()).await?;
    }
    stream.flush().await?;
    Ok(())
}

async fn read_request_body(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    let mut tmp = [0u8; 1024];

    let header_end = loop {
        let n = stream.read(&mut tmp).await?;
        if n == 0 {
            return Ok(String::new());
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = find_subslice(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = headers
        .lines()
        .find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut tmp).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
    }
    Ok(String::from_utf8_lossy(&buf[header_end..]).to_string())
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

// ── Event helpers ────────────────────────────────────────────────────

/// Receive the next event or panic after 5 seconds.
pub async fn next_event(events: &mut UnboundedReceiver<PipelineEvent>) -> PipelineEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for a pipeline event")
        .expect("event channel closed unexpectedly")
}

/// True when no event arrives within `window`.
pub async fn no_event_within(
    events: &mut UnboundedReceiver<PipelineEvent>,
    window: Duration,
) -> bool {
    tokio::time::timeout(window, events.recv()).await.is_err()
}

pub fn mcq_extraction() -> ExtractionResult {
    ExtractionResult {
        question_found: true,
        question: Some("2+2=?".into()),
        choices: Some(vec!["A) 3".into(), "B) 4".into(), "C) 5".into()]),
    }
}
