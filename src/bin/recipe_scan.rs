//! CLI binary for recipe-scan.
//!
//! A thin shim over the library crate: maps flags to `ScanConfig`, wires the
//! local (or HTTP) image store and the JSON recipe store, and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use recipe_scan::pipeline::input::load_image;
use recipe_scan::scan::attach_dish_image;
use recipe_scan::{
    HttpImageStore, ImageStore, JsonRecipeStore, LocalImageStore, ProgressCallback, Recipe,
    RecipeEdit, RecipeScanner, RecipeStore, ScanConfig, ScanConfigBuilder, ScanError,
    ScanProgressCallback, ScanRequest, ScanStage,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that logs one line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_message("Preparing…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ScanProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: ScanStage) {
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_stage_complete(&self, stage: ScanStage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<20} {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_scan_complete(&self, degraded: bool, error: Option<&str>) {
        self.bar.finish_and_clear();
        if let Some(line) = completion_line(degraded, error) {
            eprintln!("{line}");
        }
    }
}

/// Closing line for a finished scan. Errors print nothing here; `main`
/// reports them once with context.
fn completion_line(degraded: bool, error: Option<&str>) -> Option<String> {
    match (error, degraded) {
        (Some(_), _) => None,
        (None, true) => Some(format!(
            "{} saved with raw text only; {}",
            yellow("⚠"),
            bold("review the recipe")
        )),
        (None, false) => Some(format!("{} recipe saved", green("✔"))),
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Scan a card into the local store
  recipe-scan scan card.jpg

  # Scan into a folder, print the stored record as JSON
  recipe-scan scan --folder desserts --json card.jpg

  # Scan from a URL with a specific model
  recipe-scan scan --provider openai --model gpt-4.1-mini https://example.com/card.jpg

  # List unfiled recipes, then one folder
  recipe-scan list
  recipe-scan list --folder desserts

  # Rename a recipe and move it into a folder
  recipe-scan edit 5f0c…e1 --title "Nana's sponge" --folder cakes

  # Attach a photo of the finished dish
  recipe-scan attach-dish 5f0c…e1 dish.jpg

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  RECIPE_SCAN_DATA_DIR    Where images and recipes are stored
  RECIPE_SCAN_OWNER       Owner id recorded on recipes
"#;

/// Turn photographed recipe cards into structured recipes.
#[derive(Parser, Debug)]
#[command(
    name = "recipe-scan",
    version,
    about = "Turn photographed recipe cards into structured recipes",
    long_about = "Reads the text off a photographed recipe card with a vision model, then \
reshapes it into title, description, ingredients and steps without inventing content. \
Scans whose structuring fails are still saved with the raw text for review.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Directory holding `images/` and `recipes/`.
    #[arg(long, global = true, env = "RECIPE_SCAN_DATA_DIR", default_value = "recipe-data")]
    data_dir: PathBuf,

    /// Owner id recorded on (and required to access) recipes.
    #[arg(long, global = true, env = "RECIPE_SCAN_OWNER", default_value = "local")]
    owner: String,

    /// Upload images with HTTP PUT to this base URL instead of the data dir.
    #[arg(long, global = true, env = "RECIPE_SCAN_IMAGE_UPLOAD_URL")]
    image_upload_url: Option<String>,

    /// Public base URL for uploaded images (defaults to the upload URL).
    #[arg(long, global = true, env = "RECIPE_SCAN_IMAGE_PUBLIC_URL")]
    image_public_url: Option<String>,

    /// Bearer token for the image upload endpoint.
    #[arg(long, global = true, env = "RECIPE_SCAN_IMAGE_TOKEN", hide_env_values = true)]
    image_token: Option<String>,

    /// Largest accepted image in bytes.
    #[arg(
        long,
        global = true,
        env = "RECIPE_SCAN_MAX_IMAGE_BYTES",
        default_value_t = 20 * 1024 * 1024
    )]
    max_image_bytes: usize,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, global = true, env = "RECIPE_SCAN_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print JSON instead of human-readable output.
    #[arg(long, global = true, env = "RECIPE_SCAN_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "RECIPE_SCAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, global = true, env = "RECIPE_SCAN_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a recipe card (local path or HTTP/HTTPS URL).
    Scan(ScanArgs),
    /// List recipes in a folder (unfiled when no folder is given).
    List {
        #[arg(long)]
        folder: Option<String>,
    },
    /// Show one recipe.
    Show { id: Uuid },
    /// Edit a recipe's title, description, or folder.
    Edit(EditArgs),
    /// Attach a photo of the finished dish to a recipe.
    AttachDish { id: Uuid, image: String },
    /// Delete a recipe.
    Delete { id: Uuid },
}

#[derive(Args, Debug)]
struct EditArgs {
    id: Uuid,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    description: Option<String>,

    /// Move the recipe into this folder.
    #[arg(long, conflicts_with = "unfile")]
    folder: Option<String>,

    /// Move the recipe out of its folder.
    #[arg(long)]
    unfile: bool,
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Local image path or HTTP/HTTPS URL.
    input: String,

    /// Folder to file the recipe under.
    #[arg(long, env = "RECIPE_SCAN_FOLDER")]
    folder: Option<String>,

    /// LLM model ID (must be vision-capable).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Max output tokens per model call.
    #[arg(long, env = "RECIPE_SCAN_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// Path to a text file with a custom transcription prompt.
    #[arg(long, env = "RECIPE_SCAN_EXTRACTION_PROMPT")]
    extraction_prompt: Option<PathBuf>,

    /// Title for recipes saved with raw text only.
    #[arg(long, env = "RECIPE_SCAN_PLACEHOLDER_TITLE")]
    placeholder_title: Option<String>,

    /// Disable the progress spinner.
    #[arg(long, env = "RECIPE_SCAN_NO_PROGRESS")]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let g = &cli.global;

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = matches!(&cli.command, Command::Scan(a) if !a.no_progress)
        && !g.quiet
        && !g.json;
    let filter = if g.verbose {
        "debug"
    } else if g.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let images = image_store(g);
    let recipes = Arc::new(JsonRecipeStore::new(g.data_dir.join("recipes")));

    match &cli.command {
        Command::Scan(args) => run_scan(g, args, images, recipes, show_progress).await,
        Command::List { folder } => {
            let list = recipes
                .list(&g.owner, folder.as_deref())
                .await
                .context("Failed to list recipes")?;
            if g.json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else if list.is_empty() {
                eprintln!("{}", dim("No recipes."));
            } else {
                for r in &list {
                    println!(
                        "{}  {}  {}",
                        r.id,
                        dim(&r.created_at.format("%Y-%m-%d %H:%M").to_string()),
                        r.title
                    );
                }
            }
            Ok(())
        }
        Command::Show { id } => {
            let recipe = recipes.get(*id, &g.owner).await.context("Failed to load recipe")?;
            print_recipe(&recipe, g.json)
        }
        Command::Edit(args) => {
            let edit = RecipeEdit {
                title: args.title.clone(),
                description: args.description.clone(),
                folder_id: if args.unfile {
                    Some(None)
                } else {
                    args.folder.clone().map(Some)
                },
                ..Default::default()
            };
            let recipe = recipes
                .update(args.id, &g.owner, edit)
                .await
                .context("Failed to edit recipe")?;
            print_recipe(&recipe, g.json)
        }
        Command::AttachDish { id, image } => {
            let config = base_config(g).build().context("Invalid configuration")?;
            let bytes = load_image(image, config.download_timeout_secs)
                .await
                .context("Failed to read image")?;
            let recipe = attach_dish_image(
                &*images,
                &*recipes,
                &config,
                *id,
                &g.owner,
                &bytes,
            )
            .await
            .context("Failed to attach dish image")?;
            print_recipe(&recipe, g.json)
        }
        Command::Delete { id } => {
            recipes.delete(*id, &g.owner).await.context("Failed to delete recipe")?;
            if !g.quiet {
                eprintln!("{} deleted {}", green("✔"), id);
            }
            Ok(())
        }
    }
}

async fn run_scan(
    g: &GlobalArgs,
    args: &ScanArgs,
    images: Arc<dyn ImageStore>,
    recipes: Arc<dyn RecipeStore>,
    show_progress: bool,
) -> Result<()> {
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ScanProgressCallback>)
    } else {
        None
    };
    let config = build_config(g, args, progress_cb).await?;

    let bytes = load_image(&args.input, config.download_timeout_secs)
        .await
        .context("Failed to read image")?;

    let scanner = RecipeScanner::from_config(config, images, recipes)
        .context("Failed to set up the scanner")?;

    let mut request = ScanRequest::new(bytes, g.owner.clone());
    request.folder_id = args.folder.clone();

    let output = match scanner.scan(request).await {
        Ok(output) => output,
        Err(ScanError::NoTextDetected) => {
            anyhow::bail!("No legible text found in the image. Try a sharper, well-lit photo.")
        }
        Err(e) if e.is_retryable() => {
            return Err(e).context("The model service failed; try again in a moment")
        }
        Err(e) => return Err(e).context("Scan failed"),
    };

    if g.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_recipe(&output.recipe, false)?;
        if !g.quiet {
            eprintln!(
                "   {} chars read  /  {} tokens in  /  {} tokens out  /  {}ms total",
                dim(&output.stats.extracted_chars.to_string()),
                dim(&output.stats.structuring_input_tokens.to_string()),
                dim(&output.stats.structuring_output_tokens.to_string()),
                output.stats.total_duration_ms,
            );
        }
    }
    Ok(())
}

/// Image limits shared by every subcommand that reads an image.
fn base_config(g: &GlobalArgs) -> ScanConfigBuilder {
    ScanConfig::builder()
        .max_image_bytes(g.max_image_bytes)
        .download_timeout_secs(g.download_timeout)
}

/// Map CLI args to `ScanConfig`.
async fn build_config(
    g: &GlobalArgs,
    args: &ScanArgs,
    progress: Option<ProgressCallback>,
) -> Result<ScanConfig> {
    let mut builder = base_config(g).max_tokens(args.max_tokens);

    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref title) = args.placeholder_title {
        builder = builder.placeholder_title(title);
    }
    if let Some(ref path) = args.extraction_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read extraction prompt from {:?}", path))?;
        builder = builder.extraction_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn image_store(g: &GlobalArgs) -> Arc<dyn ImageStore> {
    match g.image_upload_url {
        Some(ref upload) => {
            let mut store = HttpImageStore::new(upload.as_str());
            if let Some(ref public) = g.image_public_url {
                store = store.with_public_base(public.as_str());
            }
            if let Some(ref token) = g.image_token {
                store = store.with_bearer_token(token.as_str());
            }
            Arc::new(store)
        }
        None => Arc::new(LocalImageStore::new(g.data_dir.join("images"))),
    }
}

fn print_recipe(recipe: &Recipe, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(recipe)?);
        return Ok(());
    }

    println!("{}", bold(&recipe.title));
    if !recipe.description.is_empty() {
        println!("\n{}", recipe.description);
    }
    if !recipe.ingredients.is_empty() {
        println!("\n{}", bold("Ingredients"));
        for i in &recipe.ingredients {
            let qty = [i.amount.as_str(), i.unit.as_str()]
                .iter()
                .filter(|s| !s.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join(" ");
            if qty.is_empty() {
                println!("  - {}", i.name);
            } else {
                println!("  - {} {}", qty, i.name);
            }
        }
    }
    if !recipe.instructions.is_empty() {
        println!("\n{}", bold("Instructions"));
        for (n, step) in recipe.instructions.iter().enumerate() {
            println!("  {}. {}", n + 1, step);
        }
    }
    println!("\n{} {}", dim("image:"), recipe.image_url);
    if let Some(ref dish) = recipe.dish_image_url {
        println!("{} {}", dim("dish: "), dish);
    }
    println!("{} {}", dim("id:   "), recipe.id);
    Ok(())
}
