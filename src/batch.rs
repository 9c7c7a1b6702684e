//! Folder driver: carry every image in a folder through the pipeline.
//!
//! The folder is listed once, non-recursively, and only files with a
//! supported extension become candidates. Candidates are processed one at a
//! time, in file-name order, each through all stages before the next starts.
//!
//! Every per-file failure, including a panic inside a stage, ends up in that
//! file's [`FileResult`]; none of them stop the batch. Only problems that
//! make the whole run impossible (missing folder, unconfigured backend) are
//! returned as [`Script2JsonError`].

use crate::config::ExtractionConfig;
use crate::document::ScriptDocument;
use crate::error::{FailureCategory, FileError, Script2JsonError};
use crate::output::{BatchOutput, BatchStats, FileResult, FileState};
use crate::pipeline::llm::{self, ModelBackend};
use crate::pipeline::ocr::{self, OcrEngine};
use crate::pipeline::{gate, persist, preprocess, recover};
use crate::prompts;
use futures::FutureExt;
use std::any::Any;
use std::io::ErrorKind;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Run the whole pipeline over every supported image in `folder`.
///
/// # Returns
/// `Ok(BatchOutput)` whenever the folder could be listed, even if every image
/// failed (check `output.stats`).
///
/// # Errors
/// Returns `Err(Script2JsonError)` only for fatal errors:
/// - folder not found, not a directory, or unreadable
/// - model backend not configured
///
/// The backend is resolved before the first image is touched. A missing
/// credential therefore fails the whole run with
/// [`Script2JsonError::BackendNotConfigured`], and no image is gated or
/// reported. Errors the backend returns while answering (bad key, HTTP
/// status, timeout) stay per-image. An empty folder never resolves a backend.
pub async fn run_batch(
    folder: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<BatchOutput, Script2JsonError> {
    let total_start = Instant::now();
    let folder = folder.as_ref();
    info!("Scanning folder: {}", folder.display());

    let images = scan_folder(folder).await?;
    let total = images.len();
    info!("Found {} candidate image(s)", total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut files = Vec::with_capacity(total);
    if total > 0 {
        let ctx = PipelineContext::resolve(config)?;
        for (i, path) in images.iter().enumerate() {
            let index = i + 1;
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_start(path, index, total);
            }

            let result = ctx.process_file(path).await;

            if let Some(ref cb) = config.progress_callback {
                match (&result.output, &result.error) {
                    (Some(out), None) => cb.on_file_complete(path, out, index, total),
                    (_, Some(e)) => cb.on_file_error(path, index, total, e),
                    (None, None) => {}
                }
            }
            files.push(result);
        }
    }

    let stats = BatchStats {
        candidates: total,
        persisted: files.iter().filter(|f| f.state == FileState::Persisted).count(),
        skipped: files.iter().filter(|f| f.state == FileState::Skipped).count(),
        failed: files.iter().filter(|f| f.state == FileState::Failed).count(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        ocr_duration_ms: files.iter().map(|f| f.ocr_duration_ms).sum(),
        llm_duration_ms: files.iter().map(|f| f.llm_duration_ms).sum(),
    };

    info!(
        "Batch complete: {}/{} written, {} skipped, {} failed, {}ms total",
        stats.persisted, total, stats.skipped, stats.failed, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, stats.persisted);
    }

    Ok(BatchOutput { files, stats })
}

/// Synchronous wrapper around [`run_batch`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_batch_sync(
    folder: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<BatchOutput, Script2JsonError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Script2JsonError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run_batch(folder, config))
}

/// Run a single image through every stage.
///
/// An unsupported extension yields a `Skipped` result rather than an error,
/// matching how the folder driver treats such files.
pub async fn process_image(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<FileResult, Script2JsonError> {
    let path = path.as_ref();
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(Script2JsonError::ImageNotFound {
            path: path.to_path_buf(),
        });
    }
    let ctx = PipelineContext::resolve(config)?;
    Ok(ctx.process_file(path).await)
}

/// List supported images directly inside `folder`, sorted by file name.
///
/// Subdirectories are not entered; files with other extensions are ignored.
pub async fn scan_folder(folder: impl AsRef<Path>) -> Result<Vec<PathBuf>, Script2JsonError> {
    let folder = folder.as_ref();
    let meta = tokio::fs::metadata(folder)
        .await
        .map_err(|e| folder_error(folder, e))?;
    if !meta.is_dir() {
        return Err(Script2JsonError::NotAFolder {
            path: folder.to_path_buf(),
        });
    }

    let mut entries = tokio::fs::read_dir(folder)
        .await
        .map_err(|e| folder_error(folder, e))?;

    let mut images = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| folder_error(folder, e))?
    {
        let path = entry.path();
        if !gate::is_supported(&path) {
            debug!("Ignoring {}: unsupported extension", path.display());
            continue;
        }
        // Follows symlinks, so a linked image still counts.
        match tokio::fs::metadata(&path).await {
            Ok(m) if m.is_file() => images.push(path),
            Ok(_) => debug!("Ignoring {}: not a regular file", path.display()),
            Err(e) => warn!("Ignoring {}: {}", path.display(), e),
        }
    }

    images.sort();
    Ok(images)
}

fn folder_error(folder: &Path, e: std::io::Error) -> Script2JsonError {
    let path = folder.to_path_buf();
    match e.kind() {
        ErrorKind::NotFound => Script2JsonError::FolderNotFound { path },
        ErrorKind::PermissionDenied => Script2JsonError::PermissionDenied { path },
        _ => Script2JsonError::FolderUnreadable { path, source: e },
    }
}

// ── Per-file pipeline ────────────────────────────────────────────────────

/// Collaborators resolved once per run and shared by every file.
struct PipelineContext<'a> {
    config: &'a ExtractionConfig,
    ocr: Arc<dyn OcrEngine>,
    backend: Arc<dyn ModelBackend>,
}

/// Progress of one file, updated as each stage completes.
struct Tracker {
    state: FileState,
    ocr_duration_ms: u64,
    llm_duration_ms: u64,
}

impl<'a> PipelineContext<'a> {
    fn resolve(config: &'a ExtractionConfig) -> Result<Self, Script2JsonError> {
        Ok(Self {
            config,
            ocr: ocr::resolve_engine(config),
            backend: llm::resolve_backend(config)?,
        })
    }

    /// Process one file; never panics and never returns an error.
    async fn process_file(&self, path: &Path) -> FileResult {
        let start = Instant::now();
        info!("Processing file: {}", path.display());

        let mut tracker = Tracker {
            state: FileState::Pending,
            ocr_duration_ms: 0,
            llm_duration_ms: 0,
        };

        let outcome = AssertUnwindSafe(self.run_stages(path, &mut tracker))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(FileError::Internal {
                    detail: panic_message(panic.as_ref()),
                })
            });

        let duration_ms = start.elapsed().as_millis() as u64;
        let reached = tracker.state;

        match outcome {
            Ok((output, summary)) => {
                info!("Response successfully saved as {}", output.display());
                FileResult {
                    source: path.to_path_buf(),
                    output: Some(output),
                    state: FileState::Persisted,
                    reached,
                    error: None,
                    duration_ms,
                    ocr_duration_ms: tracker.ocr_duration_ms,
                    llm_duration_ms: tracker.llm_duration_ms,
                    scene_count: summary.as_ref().map(ScriptDocument::scene_count),
                    character_count: summary.as_ref().map(ScriptDocument::character_count),
                }
            }
            Err(error) => {
                let state = if error.category() == FailureCategory::InputRejected {
                    FileState::Skipped
                } else {
                    FileState::Failed
                };
                match error.diagnostic_content() {
                    Some(content) => warn!(
                        "{}: {} (stage reached: {:?})\nContent: {}",
                        path.display(),
                        error,
                        reached,
                        content
                    ),
                    None => warn!(
                        "{}: {} (stage reached: {:?})",
                        path.display(),
                        error,
                        reached
                    ),
                }
                FileResult {
                    source: path.to_path_buf(),
                    output: None,
                    state,
                    reached,
                    error: Some(error),
                    duration_ms,
                    ocr_duration_ms: tracker.ocr_duration_ms,
                    llm_duration_ms: tracker.llm_duration_ms,
                    scene_count: None,
                    character_count: None,
                }
            }
        }
    }

    async fn run_stages(
        &self,
        path: &Path,
        tracker: &mut Tracker,
    ) -> Result<(PathBuf, Option<ScriptDocument>), FileError> {
        let config = self.config;

        // 1. Gatekeeper
        let validated = gate::validate(path, config.min_dimension).await?;
        tracker.state = FileState::Validated;

        // 2. Preprocess
        let gray = tokio::task::spawn_blocking(move || preprocess::to_grayscale(&validated.image))
            .await
            .map_err(|e| FileError::Internal {
                detail: format!("Preprocess task panicked: {e}"),
            })?;

        // 3. OCR
        let ocr_start = Instant::now();
        let text = ocr::extract_text(self.ocr.as_ref(), &gray).await;
        tracker.ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;
        let text = text?;
        tracker.state = FileState::Extracted;

        // 4. Prompt
        let prompt = prompts::build_prompt(&text);
        tracker.state = FileState::Prompted;

        // 5. Model
        let llm_start = Instant::now();
        let response = llm::invoke_model(self.backend.as_ref(), &prompt, config).await;
        tracker.llm_duration_ms = llm_start.elapsed().as_millis() as u64;
        let response = response?;
        tracker.state = FileState::Inferred;

        // 6. Recover
        let value = recover::recover_json(&response, config.recovery)?;
        tracker.state = FileState::Recovered;

        let summary = match ScriptDocument::from_value(&value) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(
                    "{}: response is valid JSON but does not match the script schema: {}",
                    path.display(),
                    e
                );
                None
            }
        };

        // 7. Persist
        let output = persist::persist(&value, path, &config.output_dir).await?;
        tracker.state = FileState::Persisted;

        Ok((output, summary))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic with non-string payload".to_string()
    }
}
