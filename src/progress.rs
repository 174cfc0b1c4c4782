//! Progress-callback trait for per-stage scan events.
//!
//! Inject an [`Arc<dyn ScanProgressCallback>`] via
//! [`crate::config::ScanConfigBuilder::progress_callback`] to receive events
//! as the scanner moves through upload, extraction, structuring and saving.
//!
//! # Example
//!
//! ```rust
//! use recipe_scan::{ScanConfig, ScanProgressCallback, ScanStage};
//! use std::sync::Arc;
//!
//! struct PrintStages;
//!
//! impl ScanProgressCallback for PrintStages {
//!     fn on_stage_start(&self, stage: ScanStage) {
//!         eprintln!("{stage}…");
//!     }
//! }
//!
//! let config = ScanConfig::builder()
//!     .progress_callback(Arc::new(PrintStages))
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// The externally visible stages of one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanStage {
    Upload,
    Extraction,
    Structuring,
    Saving,
}

impl fmt::Display for ScanStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanStage::Upload => "uploading image",
            ScanStage::Extraction => "reading text",
            ScanStage::Structuring => "structuring recipe",
            ScanStage::Saving => "saving recipe",
        };
        f.write_str(s)
    }
}

/// Called by the scanner as it moves through each stage.
///
/// Upload and extraction run concurrently, so their events may interleave.
/// All methods default to no-ops.
pub trait ScanProgressCallback: Send + Sync {
    fn on_stage_start(&self, stage: ScanStage) {
        let _ = stage;
    }

    /// `elapsed_ms` is the wall-clock time of the stage alone.
    fn on_stage_complete(&self, stage: ScanStage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called once when a scan finishes, successfully or not.
    ///
    /// * `degraded`: the recipe was saved with the raw-text fallback
    /// * `error`: stable error message when the scan failed
    fn on_scan_complete(&self, degraded: bool, error: Option<&str>) {
        let _ = (degraded, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ScanProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ScanConfig`].
pub type ProgressCallback = Arc<dyn ScanProgressCallback>;
