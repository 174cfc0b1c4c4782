//! Recipe records.
//!
//! Three shapes of the same data appear as a recipe moves through the
//! pipeline:
//!
//! * [`RecipeDraft`]: the structured fields the validator produced (or the
//!   degraded fallback). No storage URL or ownership yet.
//! * [`NewRecipe`]: a draft plus image URL and caller ownership, ready for
//!   the persistence collaborator.
//! * [`Recipe`]: the stored record, with id and creation timestamp.
//!
//! Field names serialise in camelCase (`imageUrl`, `ownerId`, …) so stored
//! documents match what existing clients read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// One ingredient line. All fields are free text: source cards use "2-3",
/// "a pinch", "½" and so on, and an empty amount is normal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub unit: String,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, amount: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            amount: amount.into(),
            unit: unit.into(),
        }
    }
}

/// The structured part of a recipe, as produced by the validator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDraft {
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    /// Cook sequence; order is meaningful.
    pub instructions: Vec<String>,
}

impl RecipeDraft {
    /// The fallback draft for a scan whose structuring could not be
    /// recovered: the raw text is kept verbatim so nothing read from the
    /// card is lost.
    pub fn degraded(placeholder_title: &str, raw_text: &str) -> Self {
        Self {
            title: placeholder_title.to_string(),
            description: raw_text.to_string(),
            ingredients: Vec::new(),
            instructions: Vec::new(),
        }
    }
}

/// A validated recipe ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecipe {
    #[serde(flatten)]
    pub draft: RecipeDraft,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dish_image_url: Option<String>,
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
}

/// A stored recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dish_image_url: Option<String>,
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Recipe {
    /// Materialise a stored record from a new recipe.
    pub fn from_new(new: NewRecipe, id: Uuid, created_at: DateTime<Utc>) -> Self {
        let NewRecipe {
            draft,
            image_url,
            dish_image_url,
            owner_id,
            folder_id,
        } = new;
        Self {
            id,
            title: draft.title,
            description: draft.description,
            ingredients: draft.ingredients,
            instructions: draft.instructions,
            image_url,
            dish_image_url,
            owner_id,
            folder_id,
            created_at,
        }
    }

    /// Apply an explicit user edit. Fields left `None` are untouched.
    pub fn apply(&mut self, edit: RecipeEdit) {
        if let Some(title) = edit.title {
            self.title = title;
        }
        if let Some(description) = edit.description {
            self.description = description;
        }
        if let Some(ingredients) = edit.ingredients {
            self.ingredients = ingredients;
        }
        if let Some(instructions) = edit.instructions {
            self.instructions = instructions;
        }
        if let Some(folder_id) = edit.folder_id {
            self.folder_id = folder_id;
        }
    }
}

/// A partial update to a stored recipe.
///
/// `folder_id: Some(None)` moves the recipe out of its folder. In JSON that
/// is `"folderId": null`; an absent key leaves the folder alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<Vec<Ingredient>>,
    pub instructions: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub folder_id: Option<Option<String>>,
}

/// A present key (even `null`) is `Some`; `default` covers the absent case.
fn present_or_null<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(de).map(Some)
}
