//! Error types for the recipe-scan library.
//!
//! Every failure a caller can see is a [`ScanError`]. Each variant maps onto
//! one stable [`ScanErrorKind`], which is what an HTTP handler or CLI should
//! branch on. Upstream detail (provider messages, I/O errors) is kept in the
//! variant fields so it can be logged, but it never leaks into `Display`:
//! a user sees "text extraction service unavailable", not a JSON blob from
//! the provider.
//!
//! One failure class is special. [`ScanError::StructuringParse`] is produced
//! by the recovery parser, but the scanner absorbs it into a degraded recipe
//! whenever raw text exists, so callers normally never receive it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// All errors returned by the recipe-scan library.
#[derive(Debug, Error)]
pub enum ScanError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No image bytes were supplied.
    #[error("No image supplied")]
    NoInput,

    /// The bytes are not an image format we recognise.
    #[error("Unsupported image format (first bytes: {magic:02x?})")]
    UnsupportedImage { magic: Vec<u8> },

    /// The image exceeds the configured size cap.
    #[error("Image is {size} bytes, above the {limit}-byte limit")]
    ImageTooLarge { size: usize, limit: usize },

    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}'")]
    DownloadFailed { url: String, reason: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The text-extraction collaborator itself failed.
    #[error("Text extraction service unavailable")]
    ExtractionService { detail: String },

    /// Extraction succeeded but the image carries no legible text.
    #[error("No legible text detected in the image")]
    NoTextDetected,

    // ── Structuring errors ────────────────────────────────────────────────
    /// The structuring collaborator itself failed (auth, quota, network).
    #[error("Structuring service unavailable")]
    StructuringService { detail: String },

    /// The structuring collaborator answered, but no JSON object could be
    /// recovered from the completion.
    #[error("Could not recover a recipe from the structuring response")]
    StructuringParse { raw: String },

    // ── Storage errors ────────────────────────────────────────────────────
    /// Uploading the image to object storage failed.
    #[error("Image storage failed")]
    Storage { detail: String },

    /// Saving or updating the recipe record failed.
    #[error("Saving the recipe failed")]
    Persistence { detail: String },

    /// No recipe with this id exists for the caller.
    #[error("Recipe {id} not found")]
    NotFound { id: Uuid },

    // ── Config errors ─────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error")]
    Internal(String),
}

/// Stable, serialisable name for each failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanErrorKind {
    NoInput,
    InvalidImage,
    ExtractionService,
    NoTextDetected,
    StructuringService,
    StructuringParse,
    Storage,
    Persistence,
    NotFound,
    Configuration,
    Internal,
}

impl ScanErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanErrorKind::NoInput => "no_input",
            ScanErrorKind::InvalidImage => "invalid_image",
            ScanErrorKind::ExtractionService => "extraction_service",
            ScanErrorKind::NoTextDetected => "no_text_detected",
            ScanErrorKind::StructuringService => "structuring_service",
            ScanErrorKind::StructuringParse => "structuring_parse",
            ScanErrorKind::Storage => "storage",
            ScanErrorKind::Persistence => "persistence",
            ScanErrorKind::NotFound => "not_found",
            ScanErrorKind::Configuration => "configuration",
            ScanErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ScanErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ScanError {
    /// The taxonomy entry this error belongs to.
    pub fn kind(&self) -> ScanErrorKind {
        match self {
            ScanError::NoInput | ScanError::FileNotFound { .. } => ScanErrorKind::NoInput,
            ScanError::UnsupportedImage { .. }
            | ScanError::ImageTooLarge { .. }
            | ScanError::DownloadFailed { .. } => ScanErrorKind::InvalidImage,
            ScanError::ExtractionService { .. } => ScanErrorKind::ExtractionService,
            ScanError::NoTextDetected => ScanErrorKind::NoTextDetected,
            ScanError::StructuringService { .. } => ScanErrorKind::StructuringService,
            ScanError::StructuringParse { .. } => ScanErrorKind::StructuringParse,
            ScanError::Storage { .. } => ScanErrorKind::Storage,
            ScanError::Persistence { .. } => ScanErrorKind::Persistence,
            ScanError::NotFound { .. } => ScanErrorKind::NotFound,
            ScanError::ProviderNotConfigured { .. } | ScanError::InvalidConfig(_) => {
                ScanErrorKind::Configuration
            }
            ScanError::Internal(_) => ScanErrorKind::Internal,
        }
    }

    /// Whether the caller may reasonably retry the same request.
    ///
    /// Only the two external-service failures qualify. The library itself
    /// never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScanError::ExtractionService { .. } | ScanError::StructuringService { .. }
        )
    }

    /// Upstream detail for logs, if the variant carries any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ScanError::DownloadFailed { reason, .. } => Some(reason),
            ScanError::ExtractionService { detail }
            | ScanError::StructuringService { detail }
            | ScanError::Storage { detail }
            | ScanError::Persistence { detail } => Some(detail),
            ScanError::StructuringParse { raw } => Some(raw),
            ScanError::Internal(detail) => Some(detail),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_hide_upstream_detail() {
        let e = ScanError::StructuringService {
            detail: "401 invalid api key sk-abc".into(),
        };
        let msg = e.to_string();
        assert!(!msg.contains("sk-abc"), "got: {msg}");
        assert_eq!(e.detail(), Some("401 invalid api key sk-abc"));
    }

    #[test]
    fn only_service_errors_are_retryable() {
        assert!(ScanError::ExtractionService { detail: "x".into() }.is_retryable());
        assert!(ScanError::StructuringService { detail: "x".into() }.is_retryable());
        assert!(!ScanError::NoTextDetected.is_retryable());
        assert!(!ScanError::Storage { detail: "x".into() }.is_retryable());
        assert!(!ScanError::Persistence { detail: "x".into() }.is_retryable());
    }

    #[test]
    fn kinds_are_stable_snake_case() {
        assert_eq!(ScanError::NoInput.kind().as_str(), "no_input");
        assert_eq!(ScanError::NoTextDetected.kind().to_string(), "no_text_detected");
        let json = serde_json::to_string(&ScanErrorKind::StructuringService).unwrap();
        assert_eq!(json, "\"structuring_service\"");
    }

    #[test]
    fn unsupported_image_display_shows_magic() {
        let e = ScanError::UnsupportedImage {
            magic: vec![0x25, 0x50, 0x44, 0x46],
        };
        assert!(e.to_string().contains("25"), "got: {e}");
        assert_eq!(e.kind(), ScanErrorKind::InvalidImage);
    }
}
