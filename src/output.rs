//! Scan request and result types.

use crate::recipe::Recipe;
use serde::{Deserialize, Serialize};

/// One inbound scan: the photographed card plus caller context.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Raw image bytes (JPEG, PNG, …).
    pub image: Vec<u8>,
    /// Authenticated caller; becomes the recipe's `ownerId`.
    pub owner_id: String,
    /// Target folder, or `None` for unfiled.
    pub folder_id: Option<String>,
}

impl ScanRequest {
    pub fn new(image: Vec<u8>, owner_id: impl Into<String>) -> Self {
        Self {
            image,
            owner_id: owner_id.into(),
            folder_id: None,
        }
    }

    pub fn with_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }
}

/// How much of the pipeline succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanStatus {
    /// The structuring response was recovered and validated.
    Structured,
    /// Structuring could not be recovered; the recipe holds the raw text in
    /// its description and a placeholder title.
    Degraded { reason: DegradedReason },
}

impl ScanStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ScanStatus::Degraded { .. })
    }
}

/// Why a scan fell back to the raw-text recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
    /// No JSON object could be recovered from the completion.
    Unparseable,
    /// A JSON object was recovered but carried none of the recipe keys.
    NotARecipe,
}

/// Timings and counters for one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Characters of raw text read off the image.
    pub extracted_chars: usize,
    pub structuring_input_tokens: usize,
    pub structuring_output_tokens: usize,
    pub upload_duration_ms: u64,
    pub extraction_duration_ms: u64,
    pub structuring_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// The result of a successful (possibly degraded) scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutput {
    pub recipe: Recipe,
    pub status: ScanStatus,
    pub stats: ScanStats,
}
