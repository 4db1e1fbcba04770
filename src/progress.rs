//! Progress-callback trait for per-stage conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConverterConfigBuilder::progress_callback`] to receive
//! events as a request moves through the pipeline. The CLI uses it to drive a
//! terminal spinner; a server could forward the events to metrics.
//!
//! # Example
//!
//! ```rust
//! use doc2scorm::{ConversionProgressCallback, ConverterConfig, SourceKind};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     runs: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_converter_start(&self, kind: SourceKind, _title: &str) {
//!         let n = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{kind} conversion #{n} started");
//!     }
//! }
//!
//! let config = ConverterConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { runs: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::request::SourceKind;
use std::path::Path;
use std::sync::Arc;

/// Called by the conversion pipeline at each stage boundary.
///
/// Implementations must be `Send + Sync`: concurrent requests share one
/// callback. All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// A workspace was allocated for a request.
    fn on_workspace_created(&self, path: &Path) {
        let _ = path;
    }

    /// The converter process is about to be spawned.
    fn on_converter_start(&self, kind: SourceKind, title: &str) {
        let _ = (kind, title);
    }

    /// The converter process exited (successfully or not).
    ///
    /// # Arguments
    /// * `success`     — exit status reported success
    /// * `duration_ms` — wall-clock time the process ran
    fn on_converter_exit(&self, success: bool, duration_ms: u64) {
        let _ = (success, duration_ms);
    }

    /// The request finished; `error` is `None` on success.
    fn on_conversion_complete(&self, kind: SourceKind, error: Option<&str>) {
        let _ = (kind, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConverterConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
