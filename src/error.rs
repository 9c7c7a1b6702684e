//! Error types for the script2json library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Script2JsonError`] — **Fatal**: the batch cannot run at all (folder
//!   missing, model backend not configured, invalid configuration). Returned
//!   as `Err(Script2JsonError)` from the top-level `run_batch*` functions.
//!
//! * [`FileError`] — **Non-fatal**: a single image was rejected or failed at
//!   one of the pipeline stages. Stored inside [`crate::output::FileResult`]
//!   and the driver moves on to the next image.
//!
//! Collaborator failures ([`OcrError`], [`BackendError`]) never escape a
//! stage; they are folded into a [`FileError`] at the stage boundary.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the script2json library.
#[derive(Debug, Error)]
pub enum Script2JsonError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The folder to scan does not exist.
    #[error("Folder not found: '{path}'\nCheck the path exists and is readable.")]
    FolderNotFound { path: PathBuf },

    /// The path exists but is a regular file, not a folder.
    #[error("Not a folder: '{path}'")]
    NotAFolder { path: PathBuf },

    /// Process does not have read permission on the folder.
    #[error("Permission denied reading '{path}'\nTry: chmod +rx {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Listing the folder failed for another reason.
    #[error("Failed to read folder '{path}': {source}")]
    FolderUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single image passed to `process_image` does not exist.
    #[error("Image file not found: '{path}'")]
    ImageNotFound { path: PathBuf },

    // ── Backend errors ────────────────────────────────────────────────────
    /// The configured model backend is not usable (missing API key etc.).
    #[error("Model backend '{backend}' is not configured.\n{hint}")]
    BackendNotConfigured { backend: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image.
///
/// Every variant skips the file; none of them stop the batch.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum FileError {
    /// The file extension is not one of the supported raster formats.
    #[error("Unsupported file type: '{extension}'")]
    UnsupportedFormat { extension: String },

    /// The image could not be decoded or is below the resolution threshold.
    #[error("Low quality image detected: {reason}")]
    LowQuality { reason: String },

    /// The OCR engine could not be run or exited with an error.
    #[error("OCR engine failed: {detail}")]
    OcrFailed { detail: String },

    /// The OCR engine ran but produced only whitespace.
    #[error("No text could be extracted from the image. It might be too low-quality or empty.")]
    NoText,

    /// Transport, authentication, or inference error from the model backend.
    #[error("Model communication failure: {detail}")]
    ModelFailed { detail: String },

    /// The model backend did not answer within the configured timeout.
    #[error("Model communication failure: no response after {secs}s")]
    ModelTimeout { secs: u64 },

    /// The model answered with an empty or whitespace-only response.
    #[error("Received empty response content. Cannot save empty JSON.")]
    EmptyResponse,

    /// No `{…}` span could be located in the model response.
    #[error("No JSON block found in the response content")]
    NoJsonFound { raw: String },

    /// A `{…}` span was located but is not valid JSON.
    #[error("Failed to decode JSON: {detail}")]
    InvalidJson { content: String, detail: String },

    /// The recovered document could not be written to disk.
    #[error("Failed to write '{path}': {detail}")]
    WriteFailed { path: PathBuf, detail: String },

    /// Any unclassified failure, including a panic inside a stage.
    #[error("An unexpected error occurred: {detail}")]
    Internal { detail: String },
}

/// The failure taxonomy a [`FileError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureCategory {
    /// Unsupported format or sub-threshold resolution.
    InputRejected,
    /// OCR produced no usable text.
    Extraction,
    /// Model backend unreachable or errored.
    Inference,
    /// No parseable JSON recoverable from the model answer.
    ResponseShape,
    /// Writing the output file failed.
    Output,
    /// Anything else.
    Unexpected,
}

impl FileError {
    /// Classify this error.
    pub fn category(&self) -> FailureCategory {
        match self {
            FileError::UnsupportedFormat { .. } | FileError::LowQuality { .. } => {
                FailureCategory::InputRejected
            }
            FileError::OcrFailed { .. } | FileError::NoText => FailureCategory::Extraction,
            FileError::ModelFailed { .. } | FileError::ModelTimeout { .. } => {
                FailureCategory::Inference
            }
            FileError::EmptyResponse
            | FileError::NoJsonFound { .. }
            | FileError::InvalidJson { .. } => FailureCategory::ResponseShape,
            FileError::WriteFailed { .. } => FailureCategory::Output,
            FileError::Internal { .. } => FailureCategory::Unexpected,
        }
    }

    /// Raw model content worth logging for diagnosis, if any.
    pub fn diagnostic_content(&self) -> Option<&str> {
        match self {
            FileError::NoJsonFound { raw } => Some(raw),
            FileError::InvalidJson { content, .. } => Some(content),
            _ => None,
        }
    }
}

/// Failure of the external OCR engine.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The engine binary could not be started.
    #[error("failed to start OCR engine '{cmd}': {source}")]
    Spawn {
        cmd: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Piping the image or collecting output failed.
    #[error("OCR engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The engine exited with a non-zero status.
    #[error("OCR engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    /// The engine did not finish in time.
    #[error("OCR engine timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The raster could not be encoded for the engine.
    #[error("failed to encode image for OCR: {0}")]
    Encode(#[from] image::ImageError),
}

/// Failure of a model backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The HTTP request could not be sent or the connection dropped.
    #[error("HTTP request to '{url}' failed: {detail}")]
    Transport { url: String, detail: String },

    /// The endpoint answered with a non-success status.
    #[error("endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body is not the expected shape.
    #[error("failed to decode model response: {0}")]
    Decode(String),

    /// The response carried no message content.
    #[error("model response contained no choices")]
    NoContent,

    /// Error surfaced by an edgequake-llm provider.
    #[error("provider '{provider}' error: {detail}")]
    Provider { provider: String, detail: String },
}

impl From<OcrError> for FileError {
    fn from(e: OcrError) -> Self {
        FileError::OcrFailed {
            detail: e.to_string(),
        }
    }
}

impl From<BackendError> for FileError {
    fn from(e: BackendError) -> Self {
        FileError::ModelFailed {
            detail: e.to_string(),
        }
    }
}
