//! Integration tests for the scan pipeline over fake collaborators.
//!
//! No network, no model: the extractor, structurer and image store are
//! in-process fakes that record how they were called.

use async_trait::async_trait;
use recipe_scan::pipeline::encode::ImageKind;
use recipe_scan::scan::attach_dish_image;
use recipe_scan::{
    Completion, DegradedReason, ImageStore, Ingredient, MemoryRecipeStore, NewRecipe, Recipe,
    RecipeScanner, RecipeStore, RecipeEdit, ScanConfig, ScanError, ScanErrorKind,
    ScanProgressCallback, ScanRequest, ScanStage, ScanStatus, Structurer, TextExtractor,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ── Fakes ────────────────────────────────────────────────────────────────────

const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0\x01\x01\0\0\x01\0\x01\0\0";

#[derive(Default)]
struct FakeImages {
    calls: AtomicUsize,
    folders: Mutex<Vec<String>>,
    fail: bool,
}

impl FakeImages {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ImageStore for FakeImages {
    async fn upload(
        &self,
        _image: &[u8],
        kind: ImageKind,
        folder: &str,
    ) -> Result<String, ScanError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ScanError::Storage {
                detail: "bucket unavailable".into(),
            });
        }
        self.folders.lock().unwrap().push(folder.to_string());
        Ok(format!(
            "https://img.example.com/{folder}/{n}.{}",
            kind.extension()
        ))
    }
}

enum Transcript {
    Text(&'static str),
    Nothing,
    Fail,
}

struct FakeExtractor {
    calls: AtomicUsize,
    transcript: Transcript,
}

impl FakeExtractor {
    fn new(transcript: Transcript) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            transcript,
        }
    }
}

#[async_trait]
impl TextExtractor for FakeExtractor {
    async fn extract(&self, _image: &[u8], _kind: ImageKind) -> Result<Option<String>, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.transcript {
            Transcript::Text(t) => Ok(Some(t.to_string())),
            Transcript::Nothing => Ok(None),
            Transcript::Fail => Err(ScanError::ExtractionService {
                detail: "503".into(),
            }),
        }
    }
}

struct FakeStructurer {
    reply: Option<&'static str>,
    prompts: Mutex<Vec<String>>,
}

impl FakeStructurer {
    fn replying(reply: &'static str) -> Self {
        Self {
            reply: Some(reply),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Structurer for FakeStructurer {
    async fn complete(&self, prompt: &str) -> Result<Completion, ScanError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.reply {
            Some(text) => Ok(Completion {
                text: text.to_string(),
                input_tokens: 120,
                output_tokens: 40,
            }),
            None => Err(ScanError::StructuringService {
                detail: "rate limited".into(),
            }),
        }
    }
}

/// A recipe store whose writes always fail.
struct BrokenRecipes;

#[async_trait]
impl RecipeStore for BrokenRecipes {
    async fn insert(&self, _recipe: NewRecipe) -> Result<Recipe, ScanError> {
        Err(ScanError::Persistence {
            detail: "disk full".into(),
        })
    }
    async fn get(&self, id: Uuid, _owner_id: &str) -> Result<Recipe, ScanError> {
        Err(ScanError::NotFound { id })
    }
    async fn list(&self, _: &str, _: Option<&str>) -> Result<Vec<Recipe>, ScanError> {
        Ok(Vec::new())
    }
    async fn update(&self, id: Uuid, _: &str, _: RecipeEdit) -> Result<Recipe, ScanError> {
        Err(ScanError::NotFound { id })
    }
    async fn set_dish_image(&self, id: Uuid, _: &str, _: String) -> Result<Recipe, ScanError> {
        Err(ScanError::NotFound { id })
    }
    async fn delete(&self, id: Uuid, _: &str) -> Result<(), ScanError> {
        Err(ScanError::NotFound { id })
    }
}

#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl ScanProgressCallback for RecordingProgress {
    fn on_stage_start(&self, stage: ScanStage) {
        self.events.lock().unwrap().push(format!("start {stage:?}"));
    }
    fn on_stage_complete(&self, stage: ScanStage, _elapsed_ms: u64) {
        self.events.lock().unwrap().push(format!("done {stage:?}"));
    }
    fn on_scan_complete(&self, degraded: bool, error: Option<&str>) {
        self.events
            .lock()
            .unwrap()
            .push(format!("finished degraded={degraded} error={}", error.is_some()));
    }
}

struct Harness {
    images: Arc<FakeImages>,
    extractor: Arc<FakeExtractor>,
    structurer: Arc<FakeStructurer>,
    recipes: Arc<MemoryRecipeStore>,
    scanner: RecipeScanner,
}

fn harness_with(
    images: FakeImages,
    extractor: FakeExtractor,
    structurer: FakeStructurer,
    config: ScanConfig,
) -> Harness {
    let images = Arc::new(images);
    let extractor = Arc::new(extractor);
    let structurer = Arc::new(structurer);
    let recipes = Arc::new(MemoryRecipeStore::new());
    let scanner = RecipeScanner::new(
        images.clone(),
        extractor.clone(),
        structurer.clone(),
        recipes.clone(),
        config,
    );
    Harness {
        images,
        extractor,
        structurer,
        recipes,
        scanner,
    }
}

fn harness(transcript: Transcript, reply: &'static str) -> Harness {
    harness_with(
        FakeImages::default(),
        FakeExtractor::new(transcript),
        FakeStructurer::replying(reply),
        ScanConfig::default(),
    )
}

const CAKE_TEXT: &str = "Cake\n2 cups flour\n1 egg\nMix. Bake 30 min.";
const CAKE_JSON: &str = r#"{"title":"Cake","description":"","ingredients":[{"name":"flour","amount":"2","unit":"cups"},{"name":"egg","amount":"1","unit":""}],"instructions":["Mix","Bake 30 min"]}"#;

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_scan_structures_cake_card() {
    let h = harness(Transcript::Text(CAKE_TEXT), CAKE_JSON);
    let out = h
        .scanner
        .scan(ScanRequest::new(JPEG.to_vec(), "alice"))
        .await
        .unwrap();

    assert_eq!(out.status, ScanStatus::Structured);
    assert_eq!(out.recipe.title, "Cake");
    assert_eq!(
        out.recipe.ingredients,
        vec![
            Ingredient::new("flour", "2", "cups"),
            Ingredient::new("egg", "1", ""),
        ]
    );
    assert_eq!(out.recipe.instructions, vec!["Mix", "Bake 30 min"]);
    assert!(!out.recipe.image_url.is_empty());
    assert_eq!(out.recipe.owner_id, "alice");
    assert_eq!(out.recipe.folder_id, None);

    assert_eq!(out.stats.extracted_chars, CAKE_TEXT.chars().count());
    assert_eq!(out.stats.structuring_input_tokens, 120);
    assert_eq!(out.stats.structuring_output_tokens, 40);

    let stored = h.recipes.get(out.recipe.id, "alice").await.unwrap();
    assert_eq!(stored, out.recipe);
}

#[tokio::test]
async fn test_scan_strips_code_fences() {
    let h = harness(
        Transcript::Text("X\nsalt"),
        "```json\n{\"title\":\"X\",\"description\":\"\",\"ingredients\":[],\"instructions\":[]}\n```",
    );
    let out = h
        .scanner
        .scan(ScanRequest::new(JPEG.to_vec(), "alice"))
        .await
        .unwrap();

    assert_eq!(out.status, ScanStatus::Structured);
    assert_eq!(out.recipe.title, "X");
    assert!(out.recipe.ingredients.is_empty());
    assert!(out.recipe.instructions.is_empty());
}

#[tokio::test]
async fn test_scan_recovers_object_inside_commentary() {
    let h = harness(
        Transcript::Text("Soup\nwater"),
        "Sure! Here it is:\n{\"title\":\"Soup\",\"ingredients\":[{\"name\":\"water\"}]}\nEnjoy.",
    );
    let out = h
        .scanner
        .scan(ScanRequest::new(JPEG.to_vec(), "alice"))
        .await
        .unwrap();

    assert_eq!(out.status, ScanStatus::Structured);
    assert_eq!(out.recipe.title, "Soup");
    assert_eq!(out.recipe.description, "");
    assert_eq!(out.recipe.ingredients, vec![Ingredient::new("water", "", "")]);
}

#[tokio::test]
async fn test_structuring_prompt_embeds_raw_text() {
    let h = harness(Transcript::Text(CAKE_TEXT), CAKE_JSON);
    h.scanner
        .scan(ScanRequest::new(JPEG.to_vec(), "alice"))
        .await
        .unwrap();

    let prompts = h.structurer.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(CAKE_TEXT));
    assert!(prompts[0].contains("Do NOT invent"));
}

#[tokio::test]
async fn test_scan_files_recipe_in_folder() {
    let h = harness(Transcript::Text(CAKE_TEXT), CAKE_JSON);
    let out = h
        .scanner
        .scan(ScanRequest::new(JPEG.to_vec(), "bob").with_folder("desserts"))
        .await
        .unwrap();

    assert_eq!(out.recipe.folder_id.as_deref(), Some("desserts"));
    assert_eq!(h.images.folders.lock().unwrap().as_slice(), ["recipes"]);

    let listed = h.recipes.list("bob", Some("desserts")).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(h.recipes.list("bob", None).await.unwrap().is_empty());
    assert!(h.recipes.list("alice", Some("desserts")).await.unwrap().is_empty());
}

// ── Fallback ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_scan_degrades_on_apology() {
    let raw = "Grandma's bread\n3 cups flour";
    let h = harness(Transcript::Text(raw), "I'm sorry, I can't help");
    let out = h
        .scanner
        .scan(ScanRequest::new(JPEG.to_vec(), "alice"))
        .await
        .unwrap();

    assert_eq!(
        out.status,
        ScanStatus::Degraded {
            reason: DegradedReason::Unparseable
        }
    );
    assert_eq!(out.recipe.title, ScanConfig::default().placeholder_title);
    assert_eq!(out.recipe.description, raw);
    assert!(out.recipe.ingredients.is_empty());
    assert!(out.recipe.instructions.is_empty());
    assert!(!out.recipe.image_url.is_empty());
    assert_eq!(h.recipes.len().await, 1);
}

#[tokio::test]
async fn test_scan_degrades_on_object_without_recipe_keys() {
    let h = harness(Transcript::Text("some text"), r#"{"error":"not a recipe"}"#);
    let out = h
        .scanner
        .scan(ScanRequest::new(JPEG.to_vec(), "alice"))
        .await
        .unwrap();

    assert_eq!(
        out.status,
        ScanStatus::Degraded {
            reason: DegradedReason::NotARecipe
        }
    );
    assert_eq!(out.recipe.description, "some text");
}

#[tokio::test]
async fn test_placeholder_title_is_configurable() {
    let config = ScanConfig::builder()
        .placeholder_title("Needs review")
        .build()
        .unwrap();
    let h = harness_with(
        FakeImages::default(),
        FakeExtractor::new(Transcript::Text("notes")),
        FakeStructurer::replying("no json here"),
        config,
    );
    let out = h
        .scanner
        .scan(ScanRequest::new(JPEG.to_vec(), "alice"))
        .await
        .unwrap();
    assert_eq!(out.recipe.title, "Needs review");
}

#[tokio::test]
async fn test_missing_title_gets_placeholder_but_stays_structured() {
    let h = harness(
        Transcript::Text("2 eggs"),
        r#"{"ingredients":[{"name":"eggs","amount":"2"}],"instructions":"Boil"}"#,
    );
    let out = h
        .scanner
        .scan(ScanRequest::new(JPEG.to_vec(), "alice"))
        .await
        .unwrap();

    assert_eq!(out.status, ScanStatus::Structured);
    assert_eq!(out.recipe.title, ScanConfig::default().placeholder_title);
    assert_eq!(out.recipe.ingredients, vec![Ingredient::new("eggs", "2", "")]);
    assert_eq!(out.recipe.instructions, vec!["Boil"]);
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_no_text_saves_nothing() {
    let h = harness(Transcript::Nothing, CAKE_JSON);
    let err = h
        .scanner
        .scan(ScanRequest::new(JPEG.to_vec(), "alice"))
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::NoTextDetected));
    assert!(!err.is_retryable());
    assert_eq!(h.structurer.calls(), 0);
    assert!(h.recipes.is_empty().await);
}

#[tokio::test]
async fn test_whitespace_transcript_counts_as_no_text() {
    let h = harness(Transcript::Text("  \n\t "), CAKE_JSON);
    let err = h
        .scanner
        .scan(ScanRequest::new(JPEG.to_vec(), "alice"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ScanErrorKind::NoTextDetected);
    assert_eq!(h.structurer.calls(), 0);
}

#[tokio::test]
async fn test_empty_image_makes_no_calls() {
    let h = harness(Transcript::Text(CAKE_TEXT), CAKE_JSON);
    let err = h
        .scanner
        .scan(ScanRequest::new(Vec::new(), "alice"))
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::NoInput));
    assert_eq!(h.images.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.structurer.calls(), 0);
    assert!(h.recipes.is_empty().await);
}

#[tokio::test]
async fn test_non_image_bytes_are_rejected_before_upload() {
    let h = harness(Transcript::Text(CAKE_TEXT), CAKE_JSON);
    let err = h
        .scanner
        .scan(ScanRequest::new(b"just some text".to_vec(), "alice"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ScanErrorKind::InvalidImage);
    assert_eq!(h.images.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_oversized_image_is_rejected() {
    let config = ScanConfig::builder().max_image_bytes(8).build().unwrap();
    let h = harness_with(
        FakeImages::default(),
        FakeExtractor::new(Transcript::Text(CAKE_TEXT)),
        FakeStructurer::replying(CAKE_JSON),
        config,
    );
    let err = h
        .scanner
        .scan(ScanRequest::new(JPEG.to_vec(), "alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::ImageTooLarge { limit: 8, .. }));
}

#[tokio::test]
async fn test_storage_failure_saves_nothing() {
    let h = harness_with(
        FakeImages::failing(),
        FakeExtractor::new(Transcript::Text(CAKE_TEXT)),
        FakeStructurer::replying(CAKE_JSON),
        ScanConfig::default(),
    );
    let err = h
        .scanner
        .scan(ScanRequest::new(JPEG.to_vec(), "alice"))
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::Storage { .. }));
    assert_eq!(h.structurer.calls(), 0);
    assert!(h.recipes.is_empty().await);
}

#[tokio::test]
async fn test_extraction_failure_is_retryable() {
    let h = harness(Transcript::Fail, CAKE_JSON);
    let err = h
        .scanner
        .scan(ScanRequest::new(JPEG.to_vec(), "alice"))
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::ExtractionService { .. }));
    assert!(err.is_retryable());
    assert_eq!(h.structurer.calls(), 0);
    assert!(h.recipes.is_empty().await);
}

#[tokio::test]
async fn test_structuring_failure_is_retryable() {
    let h = harness_with(
        FakeImages::default(),
        FakeExtractor::new(Transcript::Text(CAKE_TEXT)),
        FakeStructurer::failing(),
        ScanConfig::default(),
    );
    let err = h
        .scanner
        .scan(ScanRequest::new(JPEG.to_vec(), "alice"))
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::StructuringService { .. }));
    assert!(err.is_retryable());
    // The message never leaks the provider's detail.
    assert!(!err.to_string().contains("rate limited"));
    assert!(h.recipes.is_empty().await);
}

#[tokio::test]
async fn test_persistence_failure_propagates() {
    let images = Arc::new(FakeImages::default());
    let scanner = RecipeScanner::new(
        images.clone(),
        Arc::new(FakeExtractor::new(Transcript::Text(CAKE_TEXT))),
        Arc::new(FakeStructurer::replying(CAKE_JSON)),
        Arc::new(BrokenRecipes),
        ScanConfig::default(),
    );
    let err = scanner
        .scan(ScanRequest::new(JPEG.to_vec(), "alice"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ScanErrorKind::Persistence);
    assert!(!err.is_retryable());
    assert_eq!(images.calls.load(Ordering::SeqCst), 1);
}

// ── Progress ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_progress_reports_every_stage() {
    let progress = Arc::new(RecordingProgress::default());
    let config = ScanConfig::builder()
        .progress_callback(progress.clone())
        .build()
        .unwrap();
    let h = harness_with(
        FakeImages::default(),
        FakeExtractor::new(Transcript::Text(CAKE_TEXT)),
        FakeStructurer::replying(CAKE_JSON),
        config,
    );
    h.scanner
        .scan(ScanRequest::new(JPEG.to_vec(), "alice"))
        .await
        .unwrap();

    let events = progress.events.lock().unwrap();
    for stage in ["Upload", "Extraction", "Structuring", "Saving"] {
        assert!(events.contains(&format!("start {stage}")), "{events:?}");
        assert!(events.contains(&format!("done {stage}")), "{events:?}");
    }
    assert_eq!(
        events.last().map(String::as_str),
        Some("finished degraded=false error=false")
    );
}

#[tokio::test]
async fn test_progress_reports_failure() {
    let progress = Arc::new(RecordingProgress::default());
    let config = ScanConfig::builder()
        .progress_callback(progress.clone())
        .build()
        .unwrap();
    let h = harness_with(
        FakeImages::default(),
        FakeExtractor::new(Transcript::Nothing),
        FakeStructurer::replying(CAKE_JSON),
        config,
    );
    let _ = h.scanner.scan(ScanRequest::new(JPEG.to_vec(), "alice")).await;

    let events = progress.events.lock().unwrap();
    assert!(!events.contains(&"start Structuring".to_string()));
    assert_eq!(
        events.last().map(String::as_str),
        Some("finished degraded=false error=true")
    );
}

// ── Dish images ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_attach_dish_image_to_own_recipe() {
    let h = harness(Transcript::Text(CAKE_TEXT), CAKE_JSON);
    let out = h
        .scanner
        .scan(ScanRequest::new(JPEG.to_vec(), "alice"))
        .await
        .unwrap();

    let updated = h
        .scanner
        .attach_dish_image(out.recipe.id, "alice", JPEG)
        .await
        .unwrap();

    let dish = updated.dish_image_url.as_deref().unwrap();
    assert!(dish.contains("/dishes/"), "got {dish}");
    assert_eq!(updated.image_url, out.recipe.image_url);
    assert_eq!(
        h.recipes.get(out.recipe.id, "alice").await.unwrap().dish_image_url,
        updated.dish_image_url
    );
}

#[tokio::test]
async fn test_attach_dish_image_rejects_foreign_owner_without_upload() {
    let h = harness(Transcript::Text(CAKE_TEXT), CAKE_JSON);
    let out = h
        .scanner
        .scan(ScanRequest::new(JPEG.to_vec(), "alice"))
        .await
        .unwrap();
    let uploads_before = h.images.calls.load(Ordering::SeqCst);

    let err = attach_dish_image(
        &*h.images,
        &*h.recipes,
        &ScanConfig::default(),
        out.recipe.id,
        "mallory",
        JPEG,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ScanError::NotFound { id } if id == out.recipe.id));
    assert_eq!(h.images.calls.load(Ordering::SeqCst), uploads_before);
    assert_eq!(
        h.recipes.get(out.recipe.id, "alice").await.unwrap().dish_image_url,
        None
    );
}
