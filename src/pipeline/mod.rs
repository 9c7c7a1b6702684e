//! Pipeline stages for script extraction.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested alone and the external collaborators (OCR engine, model backend)
//! can be replaced with stubs.
//!
//! ## Data Flow
//!
//! ```text
//! gate ──▶ preprocess ──▶ ocr ──▶ prompt ──▶ llm ──▶ recover ──▶ persist
//! (ext/size) (grayscale) (text)  (template)  (raw)   (JSON value)  (<stem>.json)
//! ```
//!
//! 1. [`gate`]       — extension allow-set and minimum resolution
//! 2. [`preprocess`] — single-channel luminance raster for the OCR engine
//! 3. [`ocr`]        — run the OCR engine, reject empty output
//! 4. [`crate::prompts`] — embed the text in the extraction template
//! 5. [`llm`]        — one call to the model backend, bounded by a timeout
//! 6. [`recover`]    — locate and parse the JSON object in the answer
//! 7. [`persist`]    — atomic write of `<basename>.json`

pub mod gate;
pub mod llm;
pub mod ocr;
pub mod persist;
pub mod preprocess;
pub mod recover;
