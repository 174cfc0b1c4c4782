//! Collaborator seams for object storage and recipe persistence.
//!
//! The scanner receives both as trait objects at construction time; nothing
//! here is a process-wide client. Implementations shipped with the crate:
//!
//! | Trait | Implementation | Backing |
//! |-------|----------------|---------|
//! | [`ImageStore`]  | [`LocalImageStore`]  | files under a root directory, `file://` URLs |
//! | [`ImageStore`]  | [`HttpImageStore`]   | HTTP `PUT` to an object-store endpoint |
//! | [`RecipeStore`] | [`JsonRecipeStore`]  | one JSON document per recipe on disk |
//! | [`RecipeStore`] | [`MemoryRecipeStore`] | in-process map, for embedding and tests |
//!
//! Every record operation is scoped to an owner: a recipe that belongs to
//! someone else is reported as [`ScanError::NotFound`], exactly as if it did
//! not exist.

mod images;
mod recipes;

pub use images::{HttpImageStore, LocalImageStore};
pub use recipes::{JsonRecipeStore, MemoryRecipeStore};

use crate::error::ScanError;
use crate::pipeline::encode::ImageKind;
use crate::recipe::{NewRecipe, Recipe, RecipeEdit};
use async_trait::async_trait;
use uuid::Uuid;

/// Durable storage for image bytes.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store `image` under `folder` and return its durable URL.
    ///
    /// The upload is atomic from the caller's point of view: either a URL is
    /// returned or [`ScanError::Storage`] is.
    async fn upload(&self, image: &[u8], kind: ImageKind, folder: &str)
        -> Result<String, ScanError>;
}

/// Persistence for recipe records.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Persist a new recipe, assigning its id and `createdAt`.
    async fn insert(&self, recipe: NewRecipe) -> Result<Recipe, ScanError>;

    async fn get(&self, id: Uuid, owner_id: &str) -> Result<Recipe, ScanError>;

    /// Recipes of `owner_id` in `folder_id` (`None` = unfiled), newest first.
    async fn list(&self, owner_id: &str, folder_id: Option<&str>)
        -> Result<Vec<Recipe>, ScanError>;

    async fn update(&self, id: Uuid, owner_id: &str, edit: RecipeEdit)
        -> Result<Recipe, ScanError>;

    async fn set_dish_image(&self, id: Uuid, owner_id: &str, url: String)
        -> Result<Recipe, ScanError>;

    async fn delete(&self, id: Uuid, owner_id: &str) -> Result<(), ScanError>;
}

/// Object key for a freshly stored image.
pub(crate) fn object_key(kind: ImageKind) -> String {
    format!("{}.{}", Uuid::new_v4(), kind.extension())
}

fn in_scope(recipe: &Recipe, owner_id: &str, folder_id: Option<&str>) -> bool {
    recipe.owner_id == owner_id && recipe.folder_id.as_deref() == folder_id
}

fn newest_first(recipes: &mut [Recipe]) {
    recipes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
