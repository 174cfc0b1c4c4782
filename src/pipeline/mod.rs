//! Pipeline stages for scanning a recipe card.
//!
//! Each submodule implements exactly one step, and each step returns a typed
//! `Result` so the scanner's branching stays a total `match`.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ extract ──▶ structure ──▶ recover ──▶ validate
//! (path/URL) (sniff)   (OCR/VLM)   (LLM, T=0)    (JSON)      (normalise)
//! ```
//!
//! 1. [`input`]    : load image bytes from a local path or URL
//! 2. [`encode`]   : identify the image format; base64-wrap for vision calls
//! 3. [`extract`]  : raw text from the image, or `None`
//! 4. [`structure`]: contract prompt → raw completion
//! 5. [`recover`]  : one JSON object out of the completion, two tiers
//! 6. [`validate`] : fill gaps and coerce types into a `RecipeDraft`

pub mod encode;
pub mod extract;
pub mod input;
pub mod recover;
pub mod structure;
pub mod validate;
