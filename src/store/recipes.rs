use super::{in_scope, newest_first, RecipeStore};
use crate::error::ScanError;
use crate::recipe::{NewRecipe, Recipe, RecipeEdit};
use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// Parallel file reads when listing a directory.
const LIST_CONCURRENCY: usize = 16;

fn persistence(e: impl std::fmt::Display) -> ScanError {
    ScanError::Persistence {
        detail: e.to_string(),
    }
}

// ── JSON-file store ──────────────────────────────────────────────────────

/// One pretty-printed JSON document per recipe: `<dir>/<id>.json`.
///
/// Writes go to a temp file and are renamed into place, so a crash never
/// leaves a half-written record behind.
#[derive(Debug, Clone)]
pub struct JsonRecipeStore {
    dir: PathBuf,
}

impl JsonRecipeStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn write(&self, recipe: &Recipe) -> Result<(), ScanError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(persistence)?;
        let json = serde_json::to_vec_pretty(recipe).map_err(persistence)?;

        let path = self.path_for(recipe.id);
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &json)
            .await
            .map_err(persistence)?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(persistence)
    }

    async fn read(path: &Path) -> Result<Recipe, ScanError> {
        let bytes = tokio::fs::read(path).await.map_err(persistence)?;
        serde_json::from_slice(&bytes).map_err(persistence)
    }

    async fn load_owned(&self, id: Uuid, owner_id: &str) -> Result<Recipe, ScanError> {
        let bytes = match tokio::fs::read(self.path_for(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ScanError::NotFound { id })
            }
            Err(e) => return Err(persistence(e)),
        };
        let recipe: Recipe = serde_json::from_slice(&bytes).map_err(persistence)?;
        if recipe.owner_id != owner_id {
            return Err(ScanError::NotFound { id });
        }
        Ok(recipe)
    }
}

#[async_trait]
impl RecipeStore for JsonRecipeStore {
    async fn insert(&self, recipe: NewRecipe) -> Result<Recipe, ScanError> {
        let recipe = Recipe::from_new(recipe, Uuid::new_v4(), Utc::now());
        self.write(&recipe).await?;
        debug!("Saved recipe {} to {}", recipe.id, self.dir.display());
        Ok(recipe)
    }

    async fn get(&self, id: Uuid, owner_id: &str) -> Result<Recipe, ScanError> {
        self.load_owned(id, owner_id).await
    }

    async fn list(
        &self,
        owner_id: &str,
        folder_id: Option<&str>,
    ) -> Result<Vec<Recipe>, ScanError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(persistence(e)),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(persistence)? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }

        let loaded: Vec<(PathBuf, Result<Recipe, ScanError>)> = stream::iter(paths)
            .map(|path| async move {
                let result = Self::read(&path).await;
                (path, result)
            })
            .buffer_unordered(LIST_CONCURRENCY)
            .collect()
            .await;

        let mut recipes: Vec<Recipe> = loaded
            .into_iter()
            .filter_map(|(path, result)| match result {
                Ok(recipe) => Some(recipe),
                Err(e) => {
                    warn!("Skipping unreadable record {}: {:?}", path.display(), e.detail());
                    None
                }
            })
            .filter(|r| in_scope(r, owner_id, folder_id))
            .collect();
        newest_first(&mut recipes);
        Ok(recipes)
    }

    async fn update(
        &self,
        id: Uuid,
        owner_id: &str,
        edit: RecipeEdit,
    ) -> Result<Recipe, ScanError> {
        let mut recipe = self.load_owned(id, owner_id).await?;
        recipe.apply(edit);
        self.write(&recipe).await?;
        Ok(recipe)
    }

    async fn set_dish_image(
        &self,
        id: Uuid,
        owner_id: &str,
        url: String,
    ) -> Result<Recipe, ScanError> {
        let mut recipe = self.load_owned(id, owner_id).await?;
        recipe.dish_image_url = Some(url);
        self.write(&recipe).await?;
        Ok(recipe)
    }

    async fn delete(&self, id: Uuid, owner_id: &str) -> Result<(), ScanError> {
        self.load_owned(id, owner_id).await?;
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ScanError::NotFound { id }),
            Err(e) => Err(persistence(e)),
        }
    }
}

// ── In-memory store ──────────────────────────────────────────────────────

/// Recipes kept in a map behind an async `RwLock`.
#[derive(Debug, Default, Clone)]
pub struct MemoryRecipeStore {
    recipes: std::sync::Arc<RwLock<HashMap<Uuid, Recipe>>>,
}

impl MemoryRecipeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored recipes across all owners.
    pub async fn len(&self) -> usize {
        self.recipes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.recipes.read().await.is_empty()
    }

    async fn modify(
        &self,
        id: Uuid,
        owner_id: &str,
        f: impl FnOnce(&mut Recipe) + Send,
    ) -> Result<Recipe, ScanError> {
        let mut map = self.recipes.write().await;
        match map.get_mut(&id) {
            Some(recipe) if recipe.owner_id == owner_id => {
                f(recipe);
                Ok(recipe.clone())
            }
            _ => Err(ScanError::NotFound { id }),
        }
    }
}

#[async_trait]
impl RecipeStore for MemoryRecipeStore {
    async fn insert(&self, recipe: NewRecipe) -> Result<Recipe, ScanError> {
        let recipe = Recipe::from_new(recipe, Uuid::new_v4(), Utc::now());
        self.recipes.write().await.insert(recipe.id, recipe.clone());
        Ok(recipe)
    }

    async fn get(&self, id: Uuid, owner_id: &str) -> Result<Recipe, ScanError> {
        match self.recipes.read().await.get(&id) {
            Some(r) if r.owner_id == owner_id => Ok(r.clone()),
            _ => Err(ScanError::NotFound { id }),
        }
    }

    async fn list(
        &self,
        owner_id: &str,
        folder_id: Option<&str>,
    ) -> Result<Vec<Recipe>, ScanError> {
        let mut recipes: Vec<Recipe> = self
            .recipes
            .read()
            .await
            .values()
            .filter(|r| in_scope(r, owner_id, folder_id))
            .cloned()
            .collect();
        newest_first(&mut recipes);
        Ok(recipes)
    }

    async fn update(
        &self,
        id: Uuid,
        owner_id: &str,
        edit: RecipeEdit,
    ) -> Result<Recipe, ScanError> {
        self.modify(id, owner_id, |r| r.apply(edit)).await
    }

    async fn set_dish_image(
        &self,
        id: Uuid,
        owner_id: &str,
        url: String,
    ) -> Result<Recipe, ScanError> {
        self.modify(id, owner_id, |r| r.dish_image_url = Some(url))
            .await
    }

    async fn delete(&self, id: Uuid, owner_id: &str) -> Result<(), ScanError> {
        let mut map = self.recipes.write().await;
        if !map.get(&id).is_some_and(|r| r.owner_id == owner_id) {
            return Err(ScanError::NotFound { id });
        }
        map.remove(&id);
        Ok(())
    }
}
