//! # recipe-scan
//!
//! Turn a photographed recipe card, printed or handwritten, into a structured
//! recipe: title, description, ordered ingredients, ordered steps.
//!
//! ## Why two model calls?
//!
//! Asking one vision model to go straight from photo to recipe JSON invites
//! it to "complete" the recipe: a pinch of salt nobody wrote, a "preheat the
//! oven" step the card never had. This crate splits the job. A transcription
//! stage reads the text off the image and nothing else; a structuring stage,
//! pinned to temperature 0 and bound by a strict transcribe-don't-invent
//! prompt, only reshapes that text into JSON. What the structuring model
//! returns is then recovered and normalised defensively.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image bytes
//!  │
//!  ├─ 1. Check     non-empty, size cap, image magic bytes
//!  ├─ 2. Upload ∥ Extract   object store URL  ∥  raw text (or none)
//!  ├─ 3. Structure contract prompt → completion (T = 0)
//!  ├─ 4. Recover   strip fences → parse → brace-span parse
//!  ├─ 5. Validate  fill gaps, coerce types (or degrade to raw text)
//!  └─ 6. Persist   RecipeStore::insert → Recipe { id, createdAt, … }
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use recipe_scan::{JsonRecipeStore, LocalImageStore, RecipeScanner, ScanConfig, ScanRequest};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let scanner = RecipeScanner::from_config(
//!         ScanConfig::default(),
//!         Arc::new(LocalImageStore::new("data/images")),
//!         Arc::new(JsonRecipeStore::new("data/recipes")),
//!     )?;
//!     let image = std::fs::read("card.jpg")?;
//!     let output = scanner.scan(ScanRequest::new(image, "me")).await?;
//!     println!("{} ({} steps)", output.recipe.title, output.recipe.instructions.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `recipe-scan` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod recipe;
pub mod scan;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ScanConfig, ScanConfigBuilder};
pub use error::{ScanError, ScanErrorKind};
pub use output::{DegradedReason, ScanOutput, ScanRequest, ScanStats, ScanStatus};
pub use pipeline::extract::{TextExtractor, VisionTextExtractor};
pub use pipeline::structure::{Completion, LlmStructurer, Structurer};
pub use progress::{NoopProgressCallback, ProgressCallback, ScanProgressCallback, ScanStage};
pub use recipe::{Ingredient, NewRecipe, Recipe, RecipeDraft, RecipeEdit};
pub use scan::{resolve_draft, RecipeScanner};
pub use store::{
    HttpImageStore, ImageStore, JsonRecipeStore, LocalImageStore, MemoryRecipeStore, RecipeStore,
};
