//! Validation: normalise a recovered JSON object into a [`RecipeDraft`].
//!
//! The validator never fails a scan over a missing or oddly-typed field. It
//! fills gaps (empty description, empty lists, empty ingredient subfields)
//! and coerces scalars to text, because the model's JSON is only as tidy as
//! the card it read. The one judgement it makes is whether the object looks
//! like a recipe at all: an object carrying none of the four schema keys is
//! treated as "recovered nothing".

use crate::recipe::{Ingredient, RecipeDraft};
use serde_json::{Map, Value};
use tracing::debug;

/// Top-level keys of the structuring schema.
pub const SCHEMA_KEYS: [&str; 4] = ["title", "description", "ingredients", "instructions"];

/// Normalise `object` into a draft.
///
/// Returns `None` when the object carries none of [`SCHEMA_KEYS`]. A missing
/// or blank title becomes `placeholder_title`.
pub fn validate(object: &Map<String, Value>, placeholder_title: &str) -> Option<RecipeDraft> {
    if !SCHEMA_KEYS.iter().any(|k| object.contains_key(*k)) {
        debug!(
            "Recovered object has none of the recipe keys (keys: {:?})",
            object.keys().collect::<Vec<_>>()
        );
        return None;
    }

    let title = object.get("title").map(text).unwrap_or_default();
    let title = if title.trim().is_empty() {
        placeholder_title.to_string()
    } else {
        title
    };

    Some(RecipeDraft {
        title,
        description: object.get("description").map(text).unwrap_or_default(),
        ingredients: object.get("ingredients").map(ingredients).unwrap_or_default(),
        instructions: object.get("instructions").map(instructions).unwrap_or_default(),
    })
}

/// Coerce a scalar to text. Strings pass through untouched; numbers and
/// booleans use their JSON spelling; null, arrays and objects become "".
fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn ingredients(value: &Value) -> Vec<Ingredient> {
    let Value::Array(items) = value else {
        debug!("'ingredients' is not an array; using an empty list");
        return Vec::new();
    };

    // Objects are kept even when no subfield is usable.
    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(fields) => Some(Ingredient {
                name: fields.get("name").map(text).unwrap_or_default(),
                amount: fields.get("amount").map(text).unwrap_or_default(),
                unit: fields.get("unit").map(text).unwrap_or_default(),
            }),
            // A bare line like "salt to taste": keep it as the name.
            Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                Some(Ingredient::new(text(item), "", ""))
            }
            Value::Null | Value::Array(_) => None,
        })
        .collect()
}

fn instructions(value: &Value) -> Vec<String> {
    match value {
        Value::Array(steps) => steps
            .iter()
            .filter(|s| matches!(s, Value::String(_) | Value::Number(_)))
            .map(text)
            .collect(),
        // A single paragraph instead of a list.
        Value::String(s) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}
