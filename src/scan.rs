//! The scanner: one photographed card in, one stored recipe out.
//!
//! ## Flow
//!
//! ```text
//! image ──┬─▶ ImageStore::upload ───────────────────────────┐
//!         └─▶ TextExtractor::extract ─▶ Structurer::complete ─▶ recover ─▶ validate ─▶ RecipeStore::insert
//! ```
//!
//! Upload and extraction are independent and run concurrently. Structuring
//! waits for extraction because its prompt is built from the extracted text.
//! Nothing is retried: a failing collaborator fails the scan at once, and the
//! caller decides whether to try again (see [`ScanError::is_retryable`]).
//!
//! ## Outcomes
//!
//! | Extraction | Recovery | Result |
//! |------------|----------|--------|
//! | error      | -        | `Err(ExtractionService)` |
//! | `None`     | -        | `Err(NoTextDetected)`, nothing saved |
//! | text       | object with recipe keys | structured recipe |
//! | text       | nothing usable | degraded recipe: placeholder title, raw text as description |
//!
//! A degraded recipe still carries the uploaded image, so a structuring
//! failure never costs the user their scan.

use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::output::{DegradedReason, ScanOutput, ScanRequest, ScanStats, ScanStatus};
use crate::pipeline::encode::{self, ImageKind};
use crate::pipeline::extract::{TextExtractor, VisionTextExtractor};
use crate::pipeline::recover::{self, RecoveryTier};
use crate::pipeline::structure::{LlmStructurer, Structurer};
use crate::pipeline::validate;
use crate::progress::ScanStage;
use crate::prompts;
use crate::recipe::{NewRecipe, Recipe, RecipeDraft};
use crate::store::{ImageStore, RecipeStore};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Drives the extraction pipeline over injected collaborators.
///
/// Holds no per-scan state; one scanner can serve any number of concurrent
/// [`RecipeScanner::scan`] calls.
pub struct RecipeScanner {
    images: Arc<dyn ImageStore>,
    extractor: Arc<dyn TextExtractor>,
    structurer: Arc<dyn Structurer>,
    recipes: Arc<dyn RecipeStore>,
    config: ScanConfig,
}

impl RecipeScanner {
    pub fn new(
        images: Arc<dyn ImageStore>,
        extractor: Arc<dyn TextExtractor>,
        structurer: Arc<dyn Structurer>,
        recipes: Arc<dyn RecipeStore>,
        config: ScanConfig,
    ) -> Self {
        Self {
            images,
            extractor,
            structurer,
            recipes,
            config,
        }
    }

    /// Build a scanner whose extraction and structuring both go through the
    /// LLM provider resolved from `config`.
    pub fn from_config(
        config: ScanConfig,
        images: Arc<dyn ImageStore>,
        recipes: Arc<dyn RecipeStore>,
    ) -> Result<Self, ScanError> {
        let provider = config.resolve_provider()?;

        let mut extractor = VisionTextExtractor::new(Arc::clone(&provider), config.max_tokens);
        if let Some(ref prompt) = config.extraction_prompt {
            extractor = extractor.with_system_prompt(prompt.as_str());
        }
        let structurer = LlmStructurer::new(provider, config.max_tokens);

        Ok(Self::new(
            images,
            Arc::new(extractor),
            Arc::new(structurer),
            recipes,
            config,
        ))
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// The persistence collaborator, for record operations outside a scan.
    pub fn recipes(&self) -> &Arc<dyn RecipeStore> {
        &self.recipes
    }

    /// Scan one card and persist the resulting recipe.
    ///
    /// # Errors
    /// - `NoInput` / `UnsupportedImage` / `ImageTooLarge` before any external call
    /// - `Storage` or `ExtractionService` if either concurrent call fails
    /// - `NoTextDetected` if the image has no legible text (nothing saved)
    /// - `StructuringService` if the structuring call fails
    /// - `Persistence` if the final save fails (the uploaded image stays)
    pub async fn scan(&self, request: ScanRequest) -> Result<ScanOutput, ScanError> {
        let result = self.run(request).await;
        if let Some(ref cb) = self.config.progress_callback {
            match &result {
                Ok(out) => cb.on_scan_complete(out.status.is_degraded(), None),
                Err(e) => cb.on_scan_complete(false, Some(&e.to_string())),
            }
        }
        result
    }

    async fn run(&self, request: ScanRequest) -> Result<ScanOutput, ScanError> {
        let total_start = Instant::now();
        let ScanRequest {
            image,
            owner_id,
            folder_id,
        } = request;

        // ── Step 1: Check input ──────────────────────────────────────────
        let kind = self.check_image(&image)?;
        info!(
            "Scanning {} image ({} bytes) for owner {}",
            kind.mime_type(),
            image.len(),
            owner_id
        );

        // ── Step 2: Upload ∥ extract ─────────────────────────────────────
        let upload = async {
            self.stage_start(ScanStage::Upload);
            let start = Instant::now();
            let result = self
                .images
                .upload(&image, kind, &self.config.scan_folder)
                .await;
            let ms = elapsed_ms(start);
            if result.is_ok() {
                self.stage_complete(ScanStage::Upload, ms);
            }
            (result, ms)
        };
        let extraction = async {
            self.stage_start(ScanStage::Extraction);
            let start = Instant::now();
            let result = self.extractor.extract(&image, kind).await;
            let ms = elapsed_ms(start);
            if result.is_ok() {
                self.stage_complete(ScanStage::Extraction, ms);
            }
            (result, ms)
        };
        let ((upload, upload_ms), (extraction, extraction_ms)) = tokio::join!(upload, extraction);

        let image_url = upload.inspect_err(|e| warn!("Image upload failed: {:?}", e.detail()))?;
        info!("Stored image at {} in {}ms", image_url, upload_ms);

        let raw_text = match extraction
            .inspect_err(|e| warn!("Text extraction failed: {:?}", e.detail()))?
        {
            Some(text) if !text.trim().is_empty() => text,
            _ => {
                info!("No legible text in image ({}ms)", extraction_ms);
                return Err(ScanError::NoTextDetected);
            }
        };
        info!(
            "Extracted {} chars in {}ms",
            raw_text.chars().count(),
            extraction_ms
        );
        debug!("Raw text:\n{}", raw_text);

        // ── Step 3: Structure ────────────────────────────────────────────
        self.stage_start(ScanStage::Structuring);
        let structuring_start = Instant::now();
        let completion = self
            .structurer
            .complete(&prompts::structuring_prompt(&raw_text))
            .await
            .inspect_err(|e| warn!("Structuring failed: {:?}", e.detail()))?;
        let structuring_ms = elapsed_ms(structuring_start);
        self.stage_complete(ScanStage::Structuring, structuring_ms);

        // ── Step 4: Recover + validate (or fall back) ────────────────────
        let (draft, status) =
            resolve_draft(&raw_text, &completion.text, &self.config.placeholder_title)?;

        // ── Step 5: Persist ──────────────────────────────────────────────
        self.stage_start(ScanStage::Saving);
        let saving_start = Instant::now();
        let recipe = self
            .recipes
            .insert(NewRecipe {
                draft,
                image_url,
                dish_image_url: None,
                owner_id,
                folder_id,
            })
            .await
            .inspect_err(|e| warn!("Saving recipe failed: {:?}", e.detail()))?;
        self.stage_complete(ScanStage::Saving, elapsed_ms(saving_start));

        let stats = ScanStats {
            extracted_chars: raw_text.chars().count(),
            structuring_input_tokens: completion.input_tokens,
            structuring_output_tokens: completion.output_tokens,
            upload_duration_ms: upload_ms,
            extraction_duration_ms: extraction_ms,
            structuring_duration_ms: structuring_ms,
            total_duration_ms: elapsed_ms(total_start),
        };

        info!(
            "Scan complete: recipe {} ({} ingredients, {} steps{}) in {}ms",
            recipe.id,
            recipe.ingredients.len(),
            recipe.instructions.len(),
            if status.is_degraded() { ", degraded" } else { "" },
            stats.total_duration_ms
        );

        Ok(ScanOutput {
            recipe,
            status,
            stats,
        })
    }

    /// Upload a finished-dish photo and attach it to an existing recipe.
    pub async fn attach_dish_image(
        &self,
        recipe_id: Uuid,
        owner_id: &str,
        image: &[u8],
    ) -> Result<Recipe, ScanError> {
        attach_dish_image(
            self.images.as_ref(),
            self.recipes.as_ref(),
            &self.config,
            recipe_id,
            owner_id,
            image,
        )
        .await
    }

    fn check_image(&self, image: &[u8]) -> Result<ImageKind, ScanError> {
        check_image(image, self.config.max_image_bytes)
    }

    fn stage_start(&self, stage: ScanStage) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_start(stage);
        }
    }

    fn stage_complete(&self, stage: ScanStage, elapsed_ms: u64) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_complete(stage, elapsed_ms);
        }
    }
}

/// Upload a finished-dish photo and record its URL on a recipe.
///
/// Needs no model, only the two stores. The recipe is checked first so a
/// photo for an unknown or foreign recipe is never uploaded.
pub async fn attach_dish_image(
    images: &dyn ImageStore,
    recipes: &dyn RecipeStore,
    config: &ScanConfig,
    recipe_id: Uuid,
    owner_id: &str,
    image: &[u8],
) -> Result<Recipe, ScanError> {
    let kind = check_image(image, config.max_image_bytes)?;
    recipes.get(recipe_id, owner_id).await?;

    let url = images.upload(image, kind, &config.dish_folder).await?;
    info!("Attached dish image {} to recipe {}", url, recipe_id);
    recipes.set_dish_image(recipe_id, owner_id, url).await
}

/// Reject empty, oversized, or non-image input before any external call.
pub fn check_image(image: &[u8], max_bytes: usize) -> Result<ImageKind, ScanError> {
    if image.is_empty() {
        return Err(ScanError::NoInput);
    }
    if image.len() > max_bytes {
        return Err(ScanError::ImageTooLarge {
            size: image.len(),
            limit: max_bytes,
        });
    }
    encode::sniff(image)
}

/// Turn a structuring completion into a draft, falling back to the raw text.
///
/// This is the whole fallback policy as a pure function:
///
/// - recovered object with recipe keys → validated draft, `Structured`
/// - nothing recovered, or an object with no recipe keys, and non-blank
///   `raw_text` → degraded draft, `Degraded`
/// - the same with blank `raw_text` → `Err(StructuringParse)`; the scanner
///   never gets here because blank extraction stops at `NoTextDetected`
pub fn resolve_draft(
    raw_text: &str,
    completion: &str,
    placeholder_title: &str,
) -> Result<(RecipeDraft, ScanStatus), ScanError> {
    let reason = match recover::recover(completion) {
        Ok(recovered) => {
            if recovered.tier == RecoveryTier::BraceSpan {
                debug!("Structuring completion had text around the JSON object");
            }
            match validate::validate(&recovered.object, placeholder_title) {
                Some(draft) => return Ok((draft, ScanStatus::Structured)),
                None => DegradedReason::NotARecipe,
            }
        }
        Err(ScanError::StructuringParse { .. }) => DegradedReason::Unparseable,
        Err(other) => return Err(other),
    };

    if raw_text.trim().is_empty() {
        return Err(ScanError::StructuringParse {
            raw: completion.to_string(),
        });
    }

    warn!(
        "Structuring unusable ({:?}); saving raw text for review. Completion: {:?}",
        reason,
        truncate(completion, 200)
    );
    Ok((
        RecipeDraft::degraded(placeholder_title, raw_text),
        ScanStatus::Degraded { reason },
    ))
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
