//! # script2json
//!
//! Turn screenshots of script pages into structured JSON: scenes, locations,
//! times, characters, their actions and their dialogue.
//!
//! ## Pipeline Overview
//!
//! ```text
//! folder
//!  │
//!  ├─ 1. Gate       supported extension, both sides ≥ 500 px
//!  ├─ 2. Normalise  grayscale raster
//!  ├─ 3. OCR        tesseract (or any OcrEngine) → raw text
//!  ├─ 4. Prompt     text embedded in a fixed schema-bearing template
//!  ├─ 5. Model      hosted API, local server, or edgequake-llm provider
//!  ├─ 6. Recover    JSON object located in the (possibly chatty) answer
//!  └─ 7. Persist    <basename>.json, atomically
//! ```
//!
//! Images are processed one after another. A failure at any stage skips that
//! image only; the batch always runs to the end.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use script2json::{run_batch, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Hosted backend picked automatically when an API key is set.
//!     let config = ExtractionConfig::builder()
//!         .api_key(std::env::var("OPENAI_API_KEY")?)
//!         .build()?;
//!     let output = run_batch(".", &config).await?;
//!     for file in output.unsuccessful() {
//!         eprintln!("{}: {:?}", file.source.display(), file.error);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `script2json` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{process_image, run_batch, run_batch_sync, scan_folder};
pub use config::{BackendKind, ExtractionConfig, ExtractionConfigBuilder, RecoveryStrategy};
pub use document::{Character, Scene, ScriptDocument};
pub use error::{BackendError, FailureCategory, FileError, OcrError, Script2JsonError};
pub use output::{BatchOutput, BatchStats, FileResult, FileState};
pub use pipeline::llm::{GenerationParams, ModelBackend, OpenAiCompatibleBackend, ProviderBackend};
pub use pipeline::ocr::{OcrEngine, TesseractEngine};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
