//! # pdf2jpg
//!
//! Convert every page of a PDF document into its own JPEG (or PNG) file.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input   check the path exists and starts with %PDF
//!  ├─ 2. Render  rasterise every page via pdfium at dpi/72 scale
//!  ├─ 3. Write   encode each page, {base}_page_{n}.jpg, tmp + rename
//!  └─ 4. Output  written paths in page order + timing stats
//! ```
//!
//! Rendering completes for the whole document before the first file is
//! written. The first failing page or file aborts the conversion.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2jpg::{convert, ConversionConfig, ConversionRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default(); // 150 DPI, quality 85
//!     let request = ConversionRequest::new("report.pdf", "out");
//!     let output = convert(&request, &config).await?;
//!     for path in &output.paths {
//!         println!("{}", path.display()); // out/report_page_1.jpg, ...
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Without an async runtime, use [`ConversionWorker`] to run the conversion
//! in the background and poll for its [`TaskEvent`]s, or call
//! [`convert_sync`] directly.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2jpg` binary and [`logging`] (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2jpg = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
#[cfg(feature = "cli")]
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod task;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, ConversionRequest, OutputFormat};
pub use convert::{convert, convert_from_bytes, convert_sync, inspect, inspect_sync};
pub use engine::{PageSource, PdfiumEngine, RenderEngine};
pub use error::{ErrorKind, Pdf2JpgError};
pub use output::{ConversionOutput, ConversionStats, DocumentMetadata};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use task::{ConversionWorker, TaskEvent, TaskEvents, TaskState};
