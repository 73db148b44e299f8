//! CLI binary for pdf2jpg.
//!
//! A thin shim over the library crate: maps CLI flags to `ConversionConfig`,
//! runs the conversion on a `ConversionWorker` and prints the outcome.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2jpg::logging::{self, LoggingConfig, DEFAULT_LOG_FILE};
use pdf2jpg::{
    inspect_sync, ConversionConfig, ConversionProgressCallback, ConversionRequest,
    ConversionWorker, OutputFormat, ProgressCallback, TaskEvent,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar that fills twice as fast as pages are rendered
/// and written (each page counts once for rendering, once for writing).
struct CliProgressCallback {
    bar: ProgressBar,
    started: Instant,
}

impl CliProgressCallback {
    /// Spinner until the page count is known.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Instant::now(),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {msg:<18}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(2 * total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_pages} pages…"))
        ));
    }

    fn on_page_rendered(&self, page_num: usize, total_pages: usize) {
        self.bar.set_message(format!("page {page_num}/{total_pages}"));
        self.bar.inc(1);
        if page_num == total_pages {
            self.bar.set_prefix("Writing");
        }
    }

    fn on_page_written(&self, page_num: usize, total_pages: usize, path: &Path) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&path.display().to_string()),
        ));
        self.bar.set_message(format!("page {page_num}/{total_pages}"));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, written: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages written in {}",
            green("✔"),
            bold(&written.to_string()),
            dim(&format!("{:.1}s", self.started.elapsed().as_secs_f64())),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Every page of report.pdf as out/report_page_N.jpg (150 DPI, quality 85)
  pdf2jpg report.pdf -o out

  # Print-quality scans under a custom name
  pdf2jpg --dpi 300 --quality 95 --base-name scan contract.pdf -o scans

  # Lossless output
  pdf2jpg --format png slides.pdf -o slides

  # Inspect PDF metadata without rendering
  pdf2jpg --inspect-only report.pdf

ENVIRONMENT VARIABLES:
  PDF2JPG_*               Every flag, e.g. PDF2JPG_DPI=300
  RUST_LOG                Override log level (console and log file)
  PDFIUM_LIB_PATH         Path to an existing libpdfium; skips auto-download
  PDFIUM_AUTO_CACHE_DIR   Override the default pdfium cache directory

  PDFium (~30 MB) is downloaded automatically on first run and cached in
  ~/.cache/pdf2jpg/pdfium-7690/. No manual library setup is required.
"#;

/// Convert each page of a PDF into its own JPEG image.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2jpg",
    version,
    about = "Convert each page of a PDF into its own JPEG image",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to convert.
    input: PathBuf,

    /// Directory for the page images (created if missing).
    #[arg(short, long, env = "PDF2JPG_OUTPUT_DIR", required_unless_present = "inspect_only")]
    output_dir: Option<PathBuf>,

    /// Rendering DPI (36–1200).
    #[arg(long, env = "PDF2JPG_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(36..=1200))]
    dpi: u32,

    /// JPEG quality (1–95).
    #[arg(long, env = "PDF2JPG_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=95))]
    quality: u8,

    /// Output image format.
    #[arg(long, env = "PDF2JPG_FORMAT", value_enum, default_value = "jpeg")]
    format: FormatArg,

    /// File name prefix. Default: the input file stem.
    #[arg(long, env = "PDF2JPG_BASE_NAME")]
    base_name: Option<String>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2JPG_PASSWORD")]
    password: Option<String>,

    /// Size of the background worker pool.
    #[arg(long, env = "PDF2JPG_MAX_WORKERS", default_value_t = 4)]
    max_workers: usize,

    /// Size-rotated log file (5 MiB × 3 backups).
    #[arg(long, env = "PDF2JPG_LOG_FILE", default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Do not write a log file.
    #[arg(long, env = "PDF2JPG_NO_LOG_FILE")]
    no_log_file: bool,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Print results as JSON.
    #[arg(long, env = "PDF2JPG_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2JPG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2JPG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2JPG_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    #[value(alias = "jpg")]
    Jpeg,
    Png,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Jpeg => OutputFormat::Jpeg,
            FormatArg::Png => OutputFormat::Png,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", red("error:"), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    // ── Logging setup ────────────────────────────────────────────────────
    // Keep the console quiet while the progress bar is up; the bar provides
    // all the feedback that matters. The log file always records INFO.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let console_level = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    logging::init(&LoggingConfig {
        console_level: console_level.into(),
        file_level: if cli.verbose { "debug" } else { "info" }.into(),
        log_file: (!cli.no_log_file).then(|| cli.log_file.clone()),
        ..LoggingConfig::default()
    })
    .context("Failed to initialise logging")?;

    ensure_pdfium(cli.quiet);

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect_sync(&cli.input, &build_config(cli, None)?)
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some((w, h)) = meta.first_page_pixels(cli.dpi) {
                println!("Page 1 @{:<4} {}x{} px", cli.dpi, w, h);
            }
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(cli, progress_cb)?;
    let output_dir = cli
        .output_dir
        .as_deref()
        .context("--output-dir is required")?;
    let worker = ConversionWorker::new(config).context("Failed to start conversion worker")?;

    let mut request = ConversionRequest::new(&cli.input, output_dir).with_dpi(cli.dpi);
    if let Some(ref name) = cli.base_name {
        request = request.with_base_name(name);
    }

    let events = worker.start(request).context("Failed to start conversion")?;
    match events.wait() {
        Some(TaskEvent::Finished(paths)) => {
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&paths).context("Failed to serialise output")?
                );
            } else if !cli.quiet {
                eprintln!(
                    "Saved {} files to {}",
                    bold(&paths.len().to_string()),
                    bold(&output_dir.display().to_string())
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(TaskEvent::Failed(message)) => {
            eprintln!("{} {}", red("error:"), message);
            Ok(ExitCode::FAILURE)
        }
        Some(TaskEvent::Progress(_)) | None => {
            anyhow::bail!("Conversion ended without a result")
        }
    }
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .dpi(cli.dpi)
        .quality(cli.quality)
        .format(cli.format.into())
        .max_workers(cli.max_workers);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Download pdfium on first run, with a progress bar unless `quiet`.
///
/// Subsequent runs find it in the cache and return immediately.
fn ensure_pdfium(quiet: bool) {
    if pdfium_auto::is_pdfium_cached() {
        return;
    }

    if quiet {
        // Errors are not fatal here: binding falls back to the system library.
        if let Err(e) = pdfium_auto::ensure_pdfium_library(None) {
            tracing::warn!("PDFium download failed: {e}");
        }
        return;
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    let result = pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
        if let Some(t) = total {
            if bar.length().unwrap_or(0) != t {
                bar.set_length(t);
            }
        }
        bar.set_position(downloaded);
    }));

    match result {
        Ok(path) => {
            dl_bar.finish_and_clear();
            tracing::info!("PDFium ready at {}", path.display());
        }
        Err(e) => {
            dl_bar.abandon();
            eprintln!(
                "{} PDFium download failed ({e}); trying the system library",
                cyan("⚠")
            );
        }
    }
}
