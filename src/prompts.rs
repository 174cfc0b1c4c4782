//! Prompts for the two model-backed stages.
//!
//! The structuring template is the main defence against fabricated recipe
//! content. It forbids inventing ingredients, inferring quantities, adding
//! conventional steps, and translating, and it pins the output to a JSON
//! object with exactly four keys. Treat edits to it like edits to a schema:
//! the tests at the bottom of this file pin every rule.
//!
//! Unlike the extraction prompt, the structuring template cannot be
//! overridden through configuration.

/// Placeholder in [`STRUCTURING_TEMPLATE`] replaced by the raw extracted text.
pub const RAW_TEXT_PLACEHOLDER: &str = "{raw_text}";

/// Instruction template for turning raw recipe text into JSON.
pub const STRUCTURING_TEMPLATE: &str = r#"TASK: You are a data entry machine. You receive raw text that was read from a photographed recipe card and you copy it into a fixed JSON structure.

STRICT RULES:
1. TRANSCRIPTION ONLY: Use only what appears in the raw text. Do NOT invent ingredients that are not in the raw text.
2. NO GUESSING: Do NOT infer quantities. If the text says "flour" with no amount, the amount is "" and the unit is "".
3. NO BOILERPLATE: Do NOT add conventional steps (for example "preheat the oven", "season with salt and pepper", "serve") that are not in the raw text.
4. LANGUAGE: Do NOT translate or rephrase. Keep every word in the language and wording of the raw text.
5. If the raw text has no title, use the first line as the title. If it has no description, use "".

OUTPUT: Return ONLY a JSON object with exactly these keys and nothing else, no commentary and no code fences:
{
  "title": "title from the text",
  "description": "description from the text, or empty",
  "ingredients": [{"name": "exact item", "amount": "exact amount or empty", "unit": "exact unit or empty"}],
  "instructions": ["step 1 as written", "step 2 as written"]
}

RAW TEXT:
"""
{raw_text}
"""
"#;

/// Build the structuring prompt for one scan.
pub fn structuring_prompt(raw_text: &str) -> String {
    STRUCTURING_TEMPLATE.replacen(RAW_TEXT_PLACEHOLDER, raw_text, 1)
}

/// Sentinel the extraction model answers with when nothing is legible.
pub const NO_TEXT_SENTINEL: &str = "NO_TEXT";

/// Default system prompt for reading raw text off a recipe photo.
///
/// Used by [`crate::pipeline::extract::VisionTextExtractor`] unless
/// [`crate::config::ScanConfig::extraction_prompt`] overrides it.
pub const DEFAULT_EXTRACTION_PROMPT: &str = r#"You are an OCR engine. Read all text visible in the image, printed or handwritten.

- Output the text exactly as written, line by line, in reading order.
- Keep the original language and spelling. Do not translate or correct.
- Do not add, summarise, interpret, or format anything.
- Do not wrap the output in code fences.
- If there is no legible text at all, output exactly: NO_TEXT"#;
