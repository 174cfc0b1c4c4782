//! Structuring: send the contract prompt, get back a raw completion.
//!
//! This stage adds no domain logic. It exists so the scanner can depend on a
//! [`Structurer`] trait, and so the one policy decision that lives here,
//! temperature 0, sits in a single place. Creative latitude at this step
//! shows up as invented ingredients and "preheat the oven" steps.
//!
//! Whether the completion is valid JSON is not this stage's concern; see
//! [`crate::pipeline::recover`].

use crate::error::ScanError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Sampling temperature for structuring. Not configurable.
pub const STRUCTURING_TEMPERATURE: f32 = 0.0;

/// A raw structuring completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl Completion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Turns a single text prompt into a single completion.
#[async_trait]
pub trait Structurer: Send + Sync {
    /// Errors must be [`ScanError::StructuringService`].
    async fn complete(&self, prompt: &str) -> Result<Completion, ScanError>;
}

/// A [`Structurer`] backed by an LLM chat completion.
pub struct LlmStructurer {
    provider: Arc<dyn LLMProvider>,
    max_tokens: usize,
}

impl LlmStructurer {
    pub fn new(provider: Arc<dyn LLMProvider>, max_tokens: usize) -> Self {
        Self {
            provider,
            max_tokens,
        }
    }
}

#[async_trait]
impl Structurer for LlmStructurer {
    async fn complete(&self, prompt: &str) -> Result<Completion, ScanError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::user(prompt)];
        let options = build_options(self.max_tokens);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ScanError::StructuringService {
                detail: e.to_string(),
            })?;

        debug!(
            "Structuring: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(Completion {
            text: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}

fn build_options(max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(STRUCTURING_TEMPERATURE),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}
