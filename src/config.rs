//! Configuration types for recipe scanning.
//!
//! All scanner behaviour is controlled through [`ScanConfig`], built via its
//! [`ScanConfigBuilder`].
//!
//! The structuring temperature is deliberately absent: structuring always
//! runs at temperature 0 (see [`crate::pipeline::structure`]).

use crate::error::ScanError;
use crate::progress::ProgressCallback;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Title given to recipes whose structuring could not be recovered.
pub const DEFAULT_PLACEHOLDER_TITLE: &str = "Untitled recipe (needs review)";

/// Configuration for a [`crate::scan::RecipeScanner`].
///
/// # Example
/// ```rust
/// use recipe_scan::ScanConfig;
///
/// let config = ScanConfig::builder()
///     .model("gpt-4.1-mini")
///     .max_tokens(1024)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ScanConfig {
    /// LLM model identifier, e.g. "gpt-4.1-nano". Must be vision-capable when
    /// the same provider serves text extraction.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "gemini", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Maximum tokens the model may generate per call. Default: 2048.
    ///
    /// A long handwritten card with twenty ingredients and a dozen steps
    /// stays well under 1 500 output tokens; too low a cap truncates the JSON
    /// and pushes the scan onto the degraded path.
    pub max_tokens: usize,

    /// Custom system prompt for the text-extraction model. If None, uses
    /// [`crate::prompts::DEFAULT_EXTRACTION_PROMPT`].
    pub extraction_prompt: Option<String>,

    /// Title given to degraded recipes.
    pub placeholder_title: String,

    /// Object-store folder for scanned cards. Default: "recipes".
    pub scan_folder: String,

    /// Object-store folder for finished-dish photos. Default: "dishes".
    pub dish_folder: String,

    /// Largest accepted image, in bytes. Default: 20 MiB.
    pub max_image_bytes: usize,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional stage-progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            max_tokens: 2048,
            extraction_prompt: None,
            placeholder_title: DEFAULT_PLACEHOLDER_TITLE.to_string(),
            scan_folder: "recipes".to_string(),
            dish_folder: "dishes".to_string(),
            max_image_bytes: 20 * 1024 * 1024,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("max_tokens", &self.max_tokens)
            .field("extraction_prompt", &self.extraction_prompt.as_ref().map(|p| p.len()))
            .field("placeholder_title", &self.placeholder_title)
            .field("scan_folder", &self.scan_folder)
            .field("dish_folder", &self.dish_folder)
            .field("max_image_bytes", &self.max_image_bytes)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("progress_callback", &self.progress_callback.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl ScanConfig {
    /// Create a new builder for `ScanConfig`.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve the LLM provider, from most-specific to least-specific.
    ///
    /// 1. **Pre-built provider** (`provider`): used as-is.
    /// 2. **Named provider + model** (`provider_name`).
    /// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
    /// 4. **OpenAI key present** (`OPENAI_API_KEY`): OpenAI with `model` or
    ///    [`DEFAULT_MODEL`].
    /// 5. **Full auto-detection** (`ProviderFactory::from_env`).
    pub fn resolve_provider(&self) -> Result<Arc<dyn LLMProvider>, ScanError> {
        if let Some(ref provider) = self.provider {
            return Ok(Arc::clone(provider));
        }

        if let Some(ref name) = self.provider_name {
            let model = self.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider(name, model);
        }

        if let (Ok(prov), Ok(model)) = (
            std::env::var("EDGEQUAKE_LLM_PROVIDER"),
            std::env::var("EDGEQUAKE_MODEL"),
        ) {
            if !prov.is_empty() && !model.is_empty() {
                return create_provider(&prov, &model);
            }
        }

        if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
            if !openai_key.is_empty() {
                let model = self.model.as_deref().unwrap_or(DEFAULT_MODEL);
                return create_provider("openai", model);
            }
        }

        let (llm_provider, _embedding) =
            ProviderFactory::from_env().map_err(|e| ScanError::ProviderNotConfigured {
                provider: "auto".to_string(),
                hint: format!(
                    "No LLM provider could be auto-detected from environment.\n\
                    Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or GEMINI_API_KEY.\n\
                    Error: {}",
                    e
                ),
            })?;

        Ok(llm_provider)
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ScanError> {
    debug!("Creating LLM provider {} with model {}", provider_name, model);
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ScanError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Builder for [`ScanConfig`].
#[derive(Debug)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn extraction_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.extraction_prompt = Some(prompt.into());
        self
    }

    pub fn placeholder_title(mut self, title: impl Into<String>) -> Self {
        self.config.placeholder_title = title.into();
        self
    }

    pub fn scan_folder(mut self, folder: impl Into<String>) -> Self {
        self.config.scan_folder = folder.into();
        self
    }

    pub fn dish_folder(mut self, folder: impl Into<String>) -> Self {
        self.config.dish_folder = folder.into();
        self
    }

    pub fn max_image_bytes(mut self, n: usize) -> Self {
        self.config.max_image_bytes = n;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ScanConfig, ScanError> {
        let c = &self.config;
        if c.placeholder_title.trim().is_empty() {
            return Err(ScanError::InvalidConfig(
                "Placeholder title must not be empty".into(),
            ));
        }
        for (name, folder) in [("scan", &c.scan_folder), ("dish", &c.dish_folder)] {
            if folder.is_empty() || folder.contains("..") || folder.starts_with('/') {
                return Err(ScanError::InvalidConfig(format!(
                    "Invalid {name} folder '{folder}'"
                )));
            }
        }
        if c.max_image_bytes == 0 {
            return Err(ScanError::InvalidConfig(
                "max_image_bytes must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
