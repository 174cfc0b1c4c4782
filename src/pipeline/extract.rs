//! Text extraction: read raw text off the image.
//!
//! [`TextExtractor`] is the seam the scanner depends on. It answers
//! `Some(text)` or `None` (nothing legible) and never interprets what it
//! read. A `None` is a normal outcome and is never retried; only a failing
//! external call is an error.
//!
//! [`VisionTextExtractor`] fills the seam with a vision LLM driven by a
//! transcription-only prompt. Any other OCR backend can be plugged in by
//! implementing the trait.

use crate::error::ScanError;
use crate::pipeline::encode::{encode_image, ImageKind};
use crate::prompts::{DEFAULT_EXTRACTION_PROMPT, NO_TEXT_SENTINEL};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Reads raw text from an image.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Return the text in the image, or `None` when there is none.
    ///
    /// Errors must be [`ScanError::ExtractionService`].
    async fn extract(&self, image: &[u8], kind: ImageKind) -> Result<Option<String>, ScanError>;
}

/// A [`TextExtractor`] backed by a vision-capable LLM.
pub struct VisionTextExtractor {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    max_tokens: usize,
}

impl VisionTextExtractor {
    pub fn new(provider: Arc<dyn LLMProvider>, max_tokens: usize) -> Self {
        Self {
            provider,
            system_prompt: DEFAULT_EXTRACTION_PROMPT.to_string(),
            max_tokens,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }
}

#[async_trait]
impl TextExtractor for VisionTextExtractor {
    async fn extract(&self, image: &[u8], kind: ImageKind) -> Result<Option<String>, ScanError> {
        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user_with_images("", vec![encode_image(image, kind)]),
        ];
        let options = CompletionOptions {
            temperature: Some(0.0),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ScanError::ExtractionService {
                detail: e.to_string(),
            })?;

        debug!(
            "Extraction: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(interpret_transcription(&response.content))
    }
}

/// Map a transcription answer onto `Some(text)` / `None`.
///
/// Blank answers and the bare sentinel mean no text. Anything else is kept
/// exactly as returned.
pub fn interpret_transcription(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() || trimmed == NO_TEXT_SENTINEL {
        None
    } else {
        Some(content.to_string())
    }
}
