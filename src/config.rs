//! Configuration types for script extraction.
//!
//! All pipeline behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Values that the first version of this
//! tool hardcoded (OCR binary location, endpoint, credentials, sampling
//! parameters) are plain fields here, resolved once at start-up and passed
//! down to each stage.

use crate::error::Script2JsonError;
use crate::pipeline::llm::ModelBackend;
use crate::pipeline::ocr::OcrEngine;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default OpenAI-compatible base URL for the hosted backend.
pub const DEFAULT_HOSTED_BASE_URL: &str = "https://api.openai.com/v1";

/// Default base URL for a locally served model (LM Studio).
pub const DEFAULT_LOCAL_BASE_URL: &str = "http://localhost:1234/v1";

/// Default model for the hosted backend and named providers.
pub const DEFAULT_HOSTED_MODEL: &str = "gpt-4";

/// Default model for the local backend.
pub const DEFAULT_LOCAL_MODEL: &str = "lmstudio-community/Meta-Llama-3.1-8B-Instruct-GGUF";

/// Configuration for a batch extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use script2json::{BackendKind, ExtractionConfig};
///
/// let config = ExtractionConfig::builder()
///     .backend(BackendKind::Local)
///     .base_url("http://localhost:1234/v1")
///     .temperature(0.5)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Directory that receives `<basename>.json`. Default: `.` (the process
    /// working directory).
    pub output_dir: PathBuf,

    /// Location of the tesseract binary. Default: [`default_tesseract_cmd`].
    pub tesseract_cmd: PathBuf,

    /// Tesseract language code(s), e.g. `eng` or `eng+fra`. Default: `eng`.
    pub ocr_language: String,

    /// Per-image OCR timeout in seconds. Default: 120.
    pub ocr_timeout_secs: u64,

    /// Minimum width and height in pixels. Default: 500.
    ///
    /// Screenshots below this size rarely OCR cleanly; rejecting them before
    /// the engine runs saves a model call on garbage text.
    pub min_dimension: u32,

    /// Which model backend to talk to. Default: [`BackendKind::Auto`].
    pub backend: BackendKind,

    /// Model identifier. If `None`, the backend's default is used.
    pub model: Option<String>,

    /// API key for the hosted backend. Never sent to a local server.
    pub api_key: Option<String>,

    /// Bearer key for a local server that requires one. Default: none.
    pub local_api_key: Option<String>,

    /// Base URL override for the hosted or local backend.
    pub base_url: Option<String>,

    /// Maximum tokens the model may generate per image. Default: 750.
    pub max_tokens: usize,

    /// Sampling temperature. Default: 0.5.
    ///
    /// Low enough to keep the model on the requested schema, high enough to
    /// summarise actions instead of echoing the OCR text.
    pub temperature: f32,

    /// Per-call model timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// How the JSON payload is located inside the model answer.
    /// Default: [`RecoveryStrategy::Greedy`].
    pub recovery: RecoveryStrategy,

    /// Custom system instruction. If `None`, uses the built-in one.
    pub system_prompt: Option<String>,

    /// Pre-constructed OCR engine. Takes precedence over `tesseract_cmd`.
    pub ocr_engine: Option<Arc<dyn OcrEngine>>,

    /// Pre-constructed model backend. Takes precedence over `backend`.
    pub model_backend: Option<Arc<dyn ModelBackend>>,

    /// Optional per-file progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            tesseract_cmd: default_tesseract_cmd(),
            ocr_language: "eng".to_string(),
            ocr_timeout_secs: 120,
            min_dimension: 500,
            backend: BackendKind::default(),
            model: None,
            api_key: None,
            local_api_key: None,
            base_url: None,
            max_tokens: 750,
            temperature: 0.5,
            api_timeout_secs: 120,
            recovery: RecoveryStrategy::default(),
            system_prompt: None,
            ocr_engine: None,
            model_backend: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("output_dir", &self.output_dir)
            .field("tesseract_cmd", &self.tesseract_cmd)
            .field("ocr_language", &self.ocr_language)
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .field("min_dimension", &self.min_dimension)
            .field("backend", &self.backend)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field(
                "local_api_key",
                &self.local_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("recovery", &self.recovery)
            .field("ocr_engine", &self.ocr_engine.as_ref().map(|_| "<dyn OcrEngine>"))
            .field(
                "model_backend",
                &self.model_backend.as_ref().map(|b| b.name().to_string()),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn tesseract_cmd(mut self, cmd: impl Into<PathBuf>) -> Self {
        self.config.tesseract_cmd = cmd.into();
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn min_dimension(mut self, px: u32) -> Self {
        self.config.min_dimension = px;
        self
    }

    pub fn backend(mut self, kind: BackendKind) -> Self {
        self.config.backend = kind;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn local_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.local_api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn recovery(mut self, strategy: RecoveryStrategy) -> Self {
        self.config.recovery = strategy;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Use a pre-built OCR engine instead of spawning tesseract.
    pub fn ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.ocr_engine = Some(engine);
        self
    }

    /// Use a pre-built model backend instead of resolving one from `backend`.
    pub fn model_backend(mut self, backend: Arc<dyn ModelBackend>) -> Self {
        self.config.model_backend = Some(backend);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, Script2JsonError> {
        let c = &self.config;
        if c.min_dimension == 0 {
            return Err(Script2JsonError::InvalidConfig(
                "Minimum dimension must be ≥ 1".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(Script2JsonError::InvalidConfig(
                "Max tokens must be ≥ 1".into(),
            ));
        }
        if !(0.0..=2.0).contains(&c.temperature) {
            return Err(Script2JsonError::InvalidConfig(format!(
                "Temperature must be 0.0–2.0, got {}",
                c.temperature
            )));
        }
        if c.api_timeout_secs == 0 || c.ocr_timeout_secs == 0 {
            return Err(Script2JsonError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(Script2JsonError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which model backend answers the extraction prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    /// Hosted API if an API key is configured, otherwise whatever
    /// edgequake-llm can detect from the environment. (default)
    #[default]
    Auto,
    /// OpenAI-compatible hosted API. Requires `api_key`.
    Hosted,
    /// Locally served OpenAI-compatible endpoint. Requires only a base URL.
    Local,
    /// Any provider edgequake-llm knows by name (`anthropic`, `gemini`, `ollama`, …).
    Provider(String),
}

impl BackendKind {
    /// Parse a CLI/env value: `auto`, `hosted`, `local`, or a provider name.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "" | "auto" => BackendKind::Auto,
            "hosted" | "openai" => BackendKind::Hosted,
            "local" | "lmstudio" | "lm-studio" => BackendKind::Local,
            other => BackendKind::Provider(other.to_string()),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Auto => f.write_str("auto"),
            BackendKind::Hosted => f.write_str("hosted"),
            BackendKind::Local => f.write_str("local"),
            BackendKind::Provider(name) => f.write_str(name),
        }
    }
}

/// How the JSON payload is located inside a noisy model answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryStrategy {
    /// From the first `{` to the last `}` in the response. (default)
    ///
    /// Tolerates prose and code fences on either side, but swallows anything
    /// between two separate JSON fragments.
    #[default]
    Greedy,
    /// The first structurally balanced `{…}` object, tracking nesting depth
    /// and ignoring braces inside string literals.
    Balanced,
}

/// Platform default location of the tesseract binary.
///
/// Windows and macOS installers put tesseract in fixed locations that are
/// often missing from `PATH`; everywhere else the bare command name is used.
pub fn default_tesseract_cmd() -> PathBuf {
    if cfg!(target_os = "windows") {
        PathBuf::from(r"C:\Program Files\Tesseract-OCR\tesseract.exe")
    } else if cfg!(target_os = "macos") {
        PathBuf::from("/usr/local/bin/tesseract")
    } else {
        PathBuf::from("tesseract")
    }
}
