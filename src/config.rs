//! Typed configuration, loaded once from the environment at startup.
//!
//! Variable names follow the original tool so an existing `.env` keeps
//! working: `OPENAI_API_KEY`, `OPENAI_API_BASE`, `SMARTER_MODEL_API_BASE`,
//! `CHEAPER_MODEL`, `SMARTER_MODEL`, `OCR_ENGINE`, `TESSERACT_CMD`,
//! `NEURAL_OCR_CMD`, `GEMINI_API_KEY`, `OCR_TIMEOUT_SECS`, `RUN_LOG_PATH`.

use crate::ocr::BackendKind;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHEAPER_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_SMARTER_MODEL: &str = "gpt-4";
pub const DEFAULT_OCR_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RUN_LOG_PATH: &str = "quiz-glass-runs.log";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY environment variable not set")]
    MissingApiKey,
}

/// Endpoint + model identity for one OpenAI-compatible chat model.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// OCR backend selection and per-backend knobs.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Preferred backend first, then fallback order.
    pub backends: Vec<BackendKind>,
    /// Bound on a single backend's recognition call.
    pub timeout_secs: u64,
    /// Override for the tesseract executable (`TESSERACT_CMD`).
    pub tesseract_cmd: Option<String>,
    /// Sidecar command for the local neural backend: reads a PNG on
    /// stdin, writes recognized text on stdout.
    pub neural_cmd: String,
    pub gemini_api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub ocr: OcrConfig,
    /// Cheaper model used by the extraction stage.
    pub extraction: ModelConfig,
    /// Smarter model used by the answering stage.
    pub answering: ModelConfig,
    pub run_log_path: PathBuf,
}

impl Config {
    /// Build a config from the process environment.
    ///
    /// The only hard requirement is `OPENAI_API_KEY`; everything else has
    /// a default. Call [`load_dotenv`] first if a `.env` file should be
    /// honored.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env_nonempty("OPENAI_API_KEY").ok_or(ConfigError::MissingApiKey)?;
        let base_url = env_nonempty("OPENAI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.into());
        // The smarter model may live behind a different API base.
        let smarter_base = env_nonempty("SMARTER_MODEL_API_BASE").unwrap_or_else(|| base_url.clone());
        if smarter_base != base_url {
            log::info!("[CONFIG] Separate API base for the answering model");
        }

        let extraction = ModelConfig {
            api_key: api_key.clone(),
            base_url,
            model: env_nonempty("CHEAPER_MODEL").unwrap_or_else(|| DEFAULT_CHEAPER_MODEL.into()),
        };
        let answering = ModelConfig {
            api_key,
            base_url: smarter_base,
            model: env_nonempty("SMARTER_MODEL").unwrap_or_else(|| DEFAULT_SMARTER_MODEL.into()),
        };

        let ocr = OcrConfig {
            backends: parse_backend_list(env_nonempty("OCR_ENGINE").as_deref()),
            timeout_secs: env_nonempty("OCR_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_OCR_TIMEOUT_SECS),
            tesseract_cmd: env_nonempty("TESSERACT_CMD"),
            neural_cmd: env_nonempty("NEURAL_OCR_CMD").unwrap_or_else(|| "easyocr-stdin".into()),
            gemini_api_key: env_nonempty("GEMINI_API_KEY"),
        };

        let run_log_path = env_nonempty("RUN_LOG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RUN_LOG_PATH));

        let config = Self { ocr, extraction, answering, run_log_path };
        config.log_summary();
        Ok(config)
    }

    fn log_summary(&self) {
        log::info!(
            "[CONFIG] OCR backends: {:?} (timeout {}s)",
            self.ocr.backends,
            self.ocr.timeout_secs
        );
        log::info!("[CONFIG] Extraction model (cheaper): {}", self.extraction.model);
        log::info!("[CONFIG] Answering model (smarter): {}", self.answering.model);
        log::info!("[CONFIG] Run log: {}", self.run_log_path.display());
    }
}

/// Parse the `OCR_ENGINE` list: comma-separated backend names, preferred
/// first. Unknown names are logged and skipped; an empty result falls
/// back to the default order.
fn parse_backend_list(raw: Option<&str>) -> Vec<BackendKind> {
    let mut backends: Vec<BackendKind> = Vec::new();
    if let Some(raw) = raw {
        for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match BackendKind::from_name(name) {
                Some(kind) => {
                    if !backends.contains(&kind) {
                        backends.push(kind);
                    }
                }
                None => log::warn!("[CONFIG] Unknown OCR_ENGINE entry '{name}' — skipping"),
            }
        }
    }
    if backends.is_empty() {
        backends = vec![BackendKind::Neural, BackendKind::Tesseract];
    }
    backends
}

/// Load `.env.local` then `.env` from the working directory, first hit
/// wins. Missing files are fine.
pub fn load_dotenv() {
    for name in [".env.local", ".env"] {
        let path = std::path::Path::new(name);
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(()) => log::debug!("[CONFIG] Loaded {name}"),
                Err(e) => log::warn!("[CONFIG] Failed to load {name}: {e}"),
            }
            break;
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
