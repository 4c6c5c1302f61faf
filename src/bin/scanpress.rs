//! CLI binary for scanpress.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use scanpress::{
    inspect, recommend_parts, run, PipelineConfig, ProgressCallback, RunProgressCallback,
    SectionCatalog,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the chunk uploads, plus log
/// lines for chunk and section outcomes.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl RunProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_chunks: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>2}/{len} chunks  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total_chunks as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Digitizing");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Uploading {total_chunks} chunks…"))
        ));
    }

    fn on_chunk_start(&self, index: usize, _total: usize) {
        self.bar.set_message(format!("chunk {}", index + 1));
    }

    fn on_chunk_complete(&self, index: usize, total: usize, fragment_bytes: usize) {
        self.bar.println(format!(
            "  {} Chunk {:>2}/{:<2}  {}",
            green("✓"),
            index + 1,
            total,
            dim(&format!("{fragment_bytes:>7} bytes")),
        ));
        self.bar.inc(1);
    }

    fn on_chunk_error(&self, index: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg = if error.len() > 80 {
            format!("{}\u{2026}", &error[..error.char_indices().nth(79).map(|(i, _)| i).unwrap_or(error.len())])
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Chunk {:>2}/{:<2}  {}",
            red("✗"),
            index + 1,
            total,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_section_complete(&self, title: &str, ok: bool) {
        let mark = if ok { green("✓") } else { red("✗") };
        self.bar.println(format!("  {mark} Section {}", dim(title)));
    }

    fn on_run_complete(&self, total_chunks: usize, success_count: usize) {
        let failed = total_chunks.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} chunks digitized successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} chunks digitized  ({} failed)",
                cyan("⚠"),
                bold(&success_count.to_string()),
                total_chunks,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Inspect a scan and preview the split plan (no API key needed)
  scanpress --inspect-only guide.pdf

  # Digitize and merge only (no sections, no LLM)
  scanpress guide.pdf -w ./work

  # Full pipeline: sections + summaries + refined prose
  scanpress guide.pdf -w ./work --catalog sections.txt \
      --subject "컴퓨터활용능력 1급" --chapter "1과목"

  # Force a specific split instead of the recommendation
  scanpress guide.pdf --parts 12

  # Digitize a scan hosted on a URL
  scanpress https://example.com/guide.pdf -w ./work

  # Machine-readable record of the run
  scanpress guide.pdf --json > run.json

CATALOG FILE:
  One section-title marker per line, in document order, verbatim as the
  marker appears in the OCR output (markup included):

      <h1>1과목 스프레드시트 개요</h1>
      <h1>2과목 데이터베이스</h1>

ENVIRONMENT VARIABLES:
  UPSTAGE_API_KEY         Digitization API key (required unless --inspect-only)
  OPENAI_API_KEY          OpenAI key for the generation passes
  ANTHROPIC_API_KEY       Anthropic key for the generation passes
  SCANPRESS_WORK_DIR      Default work directory
  SCANPRESS_PARTS         Default part count override

SETUP:
  1. Set keys:    export UPSTAGE_API_KEY=up-...  OPENAI_API_KEY=sk-...
  2. Run:         scanpress guide.pdf -w ./work --catalog sections.txt
"#;

/// Digitize scanned study-guide PDFs into sectioned, AI-refined prose.
#[derive(Parser, Debug)]
#[command(
    name = "scanpress",
    version,
    about = "Digitize scanned study-guide PDFs into sectioned, AI-refined textbook prose",
    long_about = "Split a scanned PDF into OCR-sized chunks, digitize each chunk through a \
document-digitization API, merge the HTML fragments, slice the result into catalog-named \
sections, and rewrite each section into a study summary and publication-style prose.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Work directory for chunks, fragments, and results.
    #[arg(short = 'w', long, env = "SCANPRESS_WORK_DIR", default_value = "./scanpress-work")]
    work_dir: PathBuf,

    /// Number of chunks to split into (default: recommended from the scan).
    #[arg(short, long, env = "SCANPRESS_PARTS")]
    parts: Option<usize>,

    /// Section catalog file: one marker per line, in document order.
    #[arg(long, env = "SCANPRESS_CATALOG")]
    catalog: Option<PathBuf>,

    /// Subject label injected verbatim into the generation prompts.
    #[arg(long, env = "SCANPRESS_SUBJECT")]
    subject: Option<String>,

    /// Chapter label injected verbatim into the generation prompts.
    #[arg(long, env = "SCANPRESS_CHAPTER")]
    chapter: Option<String>,

    /// Skip the generation passes; stop after segmentation.
    #[arg(long, env = "SCANPRESS_NO_SUMMARIZE")]
    no_summarize: bool,

    /// Digitization API endpoint.
    #[arg(long, env = "SCANPRESS_OCR_URL")]
    ocr_url: Option<String>,

    /// OCR model identifier sent with every upload.
    #[arg(long, env = "SCANPRESS_OCR_MODEL")]
    ocr_model: Option<String>,

    /// Upload attempts per chunk before giving up on it.
    #[arg(long, env = "SCANPRESS_MAX_ATTEMPTS", default_value_t = 5)]
    max_attempts: u32,

    /// Delay between upload attempts, in milliseconds.
    #[arg(long, env = "SCANPRESS_RETRY_DELAY_MS", default_value_t = 2000)]
    retry_delay_ms: u64,

    /// Per-upload timeout in seconds (default: HTTP client default).
    #[arg(long, env = "SCANPRESS_UPLOAD_TIMEOUT")]
    upload_timeout: Option<u64>,

    /// LLM model ID for the generation passes (e.g. gpt-4.1-nano).
    #[arg(long, env = "SCANPRESS_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama.
    #[arg(long, env = "SCANPRESS_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "SCANPRESS_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Max LLM output tokens per generation call.
    #[arg(long, env = "SCANPRESS_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Print the document profile and recommended split, then exit.
    #[arg(long)]
    inspect_only: bool,

    /// Output a structured JSON record of the run instead of text.
    #[arg(long, env = "SCANPRESS_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "SCANPRESS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SCANPRESS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SCANPRESS_QUIET")]
    quiet: bool,

    /// HTTP download timeout for URL inputs, in seconds.
    #[arg(long, env = "SCANPRESS_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let profile = inspect(&cli.input).await.context("Failed to inspect PDF")?;
        let recommended = recommend_parts(&profile);

        if cli.json {
            let record = serde_json::json!({
                "profile": profile,
                "recommended_parts": recommended,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&record).context("Failed to serialise profile")?
            );
        } else {
            println!("File:              {}", cli.input);
            println!("Pages:             {}", profile.page_count);
            println!("Size:              {:.1} MB", profile.file_size_mb());
            println!(
                "Image pages:       {} ({:.0}%)",
                profile.image_pages,
                profile.image_page_ratio() * 100.0
            );
            println!("Recommended parts: {recommended}");
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn RunProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run the pipeline ─────────────────────────────────────────────────
    let output = run(&cli.input, &config).await.context("Run failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    // Summary lines (the callback already printed the per-item log).
    if !cli.quiet {
        let s = &output.stats;
        eprintln!(
            "{}  {}/{} chunks  {} fragments merged  →  {}",
            if s.failed_chunks == 0 && s.skipped_fragments == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            s.digitized_chunks,
            s.chunk_count,
            s.merged_fragments,
            bold(&output.merged_path.display().to_string()),
        );
        if s.sections_requested > 0 {
            eprintln!(
                "   {} sections extracted, {} generated  {}",
                s.sections_extracted,
                s.sections_generated,
                dim(&format!("({}ms total)", s.total_duration_ms)),
            );
        } else {
            eprintln!("   {}", dim(&format!("{}ms total", s.total_duration_ms)));
        }
        for section in output.sections.iter().filter(|s| s.error.is_some()) {
            if let Some(ref e) = section.error {
                eprintln!("   {} {}", red("✗"), e);
            }
        }
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .work_dir(cli.work_dir.clone())
        .max_attempts(cli.max_attempts)
        .retry_delay_ms(cli.retry_delay_ms)
        .download_timeout_secs(cli.download_timeout)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .summarize(!cli.no_summarize);

    if let Some(parts) = cli.parts {
        builder = builder.parts(parts);
    }
    if let Some(ref url) = cli.ocr_url {
        builder = builder.ocr_base_url(url.clone());
    }
    if let Some(ref model) = cli.ocr_model {
        builder = builder.ocr_model(model.clone());
    }
    if let Some(secs) = cli.upload_timeout {
        builder = builder.upload_timeout_secs(secs);
    }
    if let Some(ref path) = cli.catalog {
        let catalog = SectionCatalog::from_file(path)
            .with_context(|| format!("Failed to load catalog from {path:?}"))?;
        builder = builder.catalog(catalog);
    }
    if let Some(ref subject) = cli.subject {
        builder = builder.subject(subject.clone());
    }
    if let Some(ref chapter) = cli.chapter {
        builder = builder.chapter(chapter.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
