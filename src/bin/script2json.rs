//! CLI binary for script2json.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints per-file results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use script2json::{
    run_batch, BackendKind, BatchProgressCallback, ExtractionConfig, FileError, ProgressCallback,
    RecoveryStrategy,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback ────────────────────────────────────────────────────

/// Prints one line per file to stdout, optionally under an indicatif bar.
struct CliProgressCallback {
    /// Present unless `--no-progress`.
    bar: Option<ProgressBar>,
    /// Start time of the file currently being processed.
    started: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new(with_bar: bool) -> Arc<Self> {
        let bar = with_bar.then(|| {
            let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stdout());
            let style = ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} images  \
                 ⏱ {elapsed_precise}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
            bar.set_style(style);
            bar.set_prefix("Extracting");
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    /// Print a line without tearing the progress bar.
    fn emit(&self, line: String) {
        match self.bar {
            Some(ref bar) => bar.suspend(|| println!("{line}")),
            None => println!("{line}"),
        }
    }

    fn elapsed(&self) -> String {
        let ms = self
            .started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);
        dim(&format!("{:.1}s", ms as f64 / 1000.0))
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        if let Some(ref bar) = self.bar {
            bar.set_length(total_files as u64);
        }
        self.emit(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Found {total_files} image(s) to process…"))
        ));
    }

    fn on_file_start(&self, source: &Path, _index: usize, _total: usize) {
        if let Ok(mut s) = self.started.lock() {
            *s = Some(Instant::now());
        }
        if let Some(ref bar) = self.bar {
            bar.set_message(display_name(source));
        }
        self.emit(format!("Processing file: {}", source.display()));
    }

    fn on_file_complete(&self, _source: &Path, output: &Path, index: usize, total: usize) {
        self.emit(format!(
            "  {} {:>3}/{:<3}  Response successfully saved as {}  {}",
            green("✓"),
            index,
            total,
            output.display(),
            self.elapsed(),
        ));
        if let Some(ref bar) = self.bar {
            bar.inc(1);
        }
    }

    fn on_file_error(&self, _source: &Path, index: usize, total: usize, error: &FileError) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let mark = match error {
            FileError::LowQuality { .. } | FileError::UnsupportedFormat { .. } => yellow("↷"),
            _ => red("✗"),
        };
        let mut line = format!(
            "  {} {:>3}/{:<3}  {}  {}",
            mark,
            index,
            total,
            error,
            self.elapsed(),
        );
        if let Some(content) = error.diagnostic_content() {
            line.push_str(&format!("\n      {} {}", dim("content:"), content));
        }
        self.emit(line);
        if let Some(ref bar) = self.bar {
            bar.inc(1);
        }
    }

    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
        let failed = total_files.saturating_sub(success_count);
        if failed == 0 {
            println!(
                "{} {} image(s) extracted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            println!(
                "{} {}/{} image(s) extracted  ({} skipped or failed)",
                if success_count == 0 { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_files,
                red(&self.errors.load(Ordering::SeqCst).to_string()),
            );
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract every image in the current folder (hosted API)
  OPENAI_API_KEY=sk-... script2json

  # A different folder, JSON written next to the current directory
  script2json ~/screenshots

  # Local LM Studio server
  script2json --backend local --base-url http://localhost:1234/v1

  # Any edgequake-llm provider
  script2json --backend anthropic --model claude-sonnet-4-20250514

  # Tesseract outside PATH
  script2json --tesseract-cmd /opt/homebrew/bin/tesseract

  # Machine-readable run report
  script2json --json > report.json

SUPPORTED IMAGES:
  png, jpg, jpeg, tiff, bmp, gif (case-insensitive), at least 500×500 px.
  Other files in the folder are ignored; subfolders are not scanned.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          Hosted API key (selects the hosted backend in auto mode)
  SCRIPT2JSON_LOCAL_API_KEY  Key for a local server (OPENAI_API_KEY is never sent there)
  SCRIPT2JSON_BACKEND     auto, hosted, local, or an edgequake-llm provider name
  SCRIPT2JSON_MODEL       Model ID
  SCRIPT2JSON_BASE_URL    Endpoint base URL for hosted/local backends
  TESSERACT_CMD           Path to the tesseract binary
  EDGEQUAKE_LLM_PROVIDER  Provider for auto-detection (with EDGEQUAKE_MODEL)
  RUST_LOG                Log filter (overrides -v/-q)
"#;

/// Extract scenes, characters, actions and dialogue from script screenshots.
#[derive(Parser, Debug)]
#[command(
    name = "script2json",
    version,
    about = "Extract structured JSON from screenshots of script pages via OCR and an LLM",
    long_about = "Run OCR over every supported image in a folder, ask a language model to \
restructure the text into scenes, characters, actions and dialogue, and write one \
<basename>.json per image. Failures skip the image; the batch always completes.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Folder containing the images.
    #[arg(default_value = ".")]
    folder: PathBuf,

    /// Directory to write <basename>.json into.
    #[arg(short, long, env = "SCRIPT2JSON_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Model backend: auto, hosted, local, or an edgequake-llm provider name.
    #[arg(long, env = "SCRIPT2JSON_BACKEND", default_value = "auto")]
    backend: String,

    /// Model ID (hosted default: gpt-4).
    #[arg(long, env = "SCRIPT2JSON_MODEL")]
    model: Option<String>,

    /// API key for the hosted backend.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Bearer key for a local server that requires one (the hosted key is
    /// never sent to it).
    #[arg(long, env = "SCRIPT2JSON_LOCAL_API_KEY", hide_env_values = true)]
    local_api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint.
    #[arg(long, env = "SCRIPT2JSON_BASE_URL")]
    base_url: Option<String>,

    /// Path to the tesseract binary (default depends on platform).
    #[arg(long, env = "TESSERACT_CMD")]
    tesseract_cmd: Option<PathBuf>,

    /// Tesseract language(s), e.g. eng or eng+fra.
    #[arg(long, env = "SCRIPT2JSON_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// OCR timeout per image in seconds.
    #[arg(long, env = "SCRIPT2JSON_OCR_TIMEOUT", default_value_t = 120)]
    ocr_timeout: u64,

    /// Minimum width and height in pixels.
    #[arg(long, env = "SCRIPT2JSON_MIN_DIMENSION", default_value_t = 500)]
    min_dimension: u32,

    /// Max model output tokens per image.
    #[arg(long, env = "SCRIPT2JSON_MAX_TOKENS", default_value_t = 750)]
    max_tokens: usize,

    /// Model temperature (0.0–2.0).
    #[arg(long, env = "SCRIPT2JSON_TEMPERATURE", default_value_t = 0.5)]
    temperature: f32,

    /// Model call timeout per image in seconds.
    #[arg(long, env = "SCRIPT2JSON_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// How to locate JSON in the model answer.
    #[arg(long, env = "SCRIPT2JSON_RECOVERY", value_enum, default_value = "greedy")]
    recovery: RecoveryArg,

    /// Path to a text file containing a custom system instruction.
    #[arg(long, env = "SCRIPT2JSON_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Print the run report (BatchOutput) as JSON instead of progress lines.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar (per-file lines are still printed).
    #[arg(long, env = "SCRIPT2JSON_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum RecoveryArg {
    Greedy,
    Balanced,
}

impl From<RecoveryArg> for RecoveryStrategy {
    fn from(v: RecoveryArg) -> Self {
        match v {
            RecoveryArg::Greedy => RecoveryStrategy::Greedy,
            RecoveryArg::Balanced => RecoveryStrategy::Balanced,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Per-file lines on stdout already report every outcome, so library
    // logs default to errors only unless -v is given.
    let show_lines = !cli.quiet && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_lines {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_lines {
        let cb = CliProgressCallback::new(!cli.no_progress);
        Some(cb as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output = run_batch(&cli.folder, &config)
        .await
        .context("Batch could not run")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        println!(
            "   {} written  /  {} skipped  /  {} failed  —  {}ms total",
            output.stats.persisted,
            output.stats.skipped,
            output.stats.failed,
            output.stats.total_duration_ms,
        );
    }

    // Individual file failures never change the exit status.
    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .output_dir(&cli.output_dir)
        .ocr_language(&cli.ocr_lang)
        .ocr_timeout_secs(cli.ocr_timeout)
        .min_dimension(cli.min_dimension)
        .backend(BackendKind::parse(&cli.backend))
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .api_timeout_secs(cli.api_timeout)
        .recovery(cli.recovery.clone().into());

    if let Some(ref cmd) = cli.tesseract_cmd {
        builder = builder.tesseract_cmd(cmd);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref key) = cli.local_api_key {
        builder = builder.local_api_key(key);
    }
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
