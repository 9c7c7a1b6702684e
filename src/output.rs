//! Result types returned by the batch driver.

use crate::error::FileError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How far an image got through the pipeline.
///
/// Transitions are strictly forward: `Pending → Validated → Extracted →
/// Prompted → Inferred → Recovered → Persisted`, or `Skipped`/`Failed` from
/// any gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileState {
    Pending,
    Validated,
    Extracted,
    Prompted,
    Inferred,
    Recovered,
    Persisted,
    /// Rejected by the gatekeeper (unreadable or below the resolution threshold).
    Skipped,
    /// Failed at a later stage.
    Failed,
}

impl FileState {
    /// Whether processing of the file has ended.
    pub fn is_terminal(self) -> bool {
        matches!(self, FileState::Persisted | FileState::Skipped | FileState::Failed)
    }
}

/// Outcome for one input image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResult {
    /// Path of the input image.
    pub source: PathBuf,
    /// Path of the written JSON, set only when `state == Persisted`.
    pub output: Option<PathBuf>,
    /// Final state.
    pub state: FileState,
    /// Last non-terminal state reached before the file was skipped or failed.
    pub reached: FileState,
    /// Set when the file was skipped or failed.
    pub error: Option<FileError>,
    /// Wall-clock time spent on this file.
    pub duration_ms: u64,
    /// Time spent inside the OCR engine.
    pub ocr_duration_ms: u64,
    /// Time spent waiting for the model backend.
    pub llm_duration_ms: u64,
    /// Scenes in the written document, when it matches the schema.
    pub scene_count: Option<usize>,
    /// Character entries in the written document, when it matches the schema.
    pub character_count: Option<usize>,
}

impl FileResult {
    pub fn is_success(&self) -> bool {
        self.state == FileState::Persisted
    }
}

/// Aggregate counters for one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// Images with a supported extension found by the scan.
    pub candidates: usize,
    /// Images whose JSON was written.
    pub persisted: usize,
    /// Images rejected by the gatekeeper.
    pub skipped: usize,
    /// Images that failed after passing the gatekeeper.
    pub failed: usize,
    pub total_duration_ms: u64,
    pub ocr_duration_ms: u64,
    pub llm_duration_ms: u64,
}

/// Everything a batch run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    /// One entry per candidate image, in processing order.
    pub files: Vec<FileResult>,
    pub stats: BatchStats,
}

impl BatchOutput {
    /// Iterate over files that did not produce output.
    pub fn unsuccessful(&self) -> impl Iterator<Item = &FileResult> {
        self.files.iter().filter(|f| !f.is_success())
    }
}
