//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the driver carries each image through the pipeline.
//!
//! # Example
//!
//! ```rust
//! use script2json::{BatchProgressCallback, ExtractionConfig};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     written: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, source: &Path, output: &Path, _index: usize, _total: usize) {
//!         self.written.fetch_add(1, Ordering::SeqCst);
//!         println!("{} -> {}", source.display(), output.display());
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { written: AtomicUsize::new(0) });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::FileError;
use std::path::Path;
use std::sync::Arc;

/// Called by the folder driver as it processes each image.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is 1-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after the folder scan, before any image is processed.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before the gatekeeper looks at an image.
    fn on_file_start(&self, source: &Path, index: usize, total: usize) {
        let _ = (source, index, total);
    }

    /// Called when `<basename>.json` has been written.
    fn on_file_complete(&self, source: &Path, output: &Path, index: usize, total: usize) {
        let _ = (source, output, index, total);
    }

    /// Called when an image is skipped or fails at any stage.
    fn on_file_error(&self, source: &Path, index: usize, total: usize, error: &FileError) {
        let _ = (source, index, total, error);
    }

    /// Called once after every image has been attempted.
    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
