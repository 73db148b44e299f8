//! Configuration types for PDF-to-image conversion.
//!
//! Process-wide knobs (image format, quality, default resolution, worker pool
//! size, render engine) live in [`ConversionConfig`], built via its
//! [`ConversionConfigBuilder`]. What changes per call (which file, where to,
//! optionally a different resolution or base name) lives in
//! [`ConversionRequest`].
//!
//! Nothing here is global: a config is passed explicitly into every
//! conversion, so tests can swap in a fake render engine and a temp
//! directory without touching process state.

use crate::engine::RenderEngine;
use crate::error::Pdf2JpgError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Default render resolution in dots per inch.
pub const DEFAULT_DPI: u32 = 150;
/// Lowest accepted render resolution.
pub const MIN_DPI: u32 = 36;
/// Highest accepted render resolution.
pub const MAX_DPI: u32 = 1200;
/// Default JPEG quality.
pub const DEFAULT_QUALITY: u8 = 85;
/// Highest accepted JPEG quality.
pub const MAX_QUALITY: u8 = 95;
/// Default size of the background worker's blocking pool.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Configuration shared by every conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2jpg::{ConversionConfig, OutputFormat};
///
/// let config = ConversionConfig::builder()
///     .dpi(200)
///     .quality(90)
///     .format(OutputFormat::Jpeg)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Default rendering resolution. Range: 36–1200. Default: 150.
    ///
    /// Pages are scaled by `dpi / 72` since 72 DPI is one pixel per PDF
    /// point. A [`ConversionRequest`] may override this per call.
    pub dpi: u32,

    /// JPEG quality. Range: 1–95. Default: 85.
    ///
    /// Ignored for lossless formats.
    pub quality: u8,

    /// Output image format. Default: [`OutputFormat::Jpeg`].
    pub format: OutputFormat,

    /// Blocking-pool size of [`crate::task::ConversionWorker`]. Default: 4.
    ///
    /// The pipeline itself is sequential and never uses more than one of
    /// these threads.
    pub max_workers: usize,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Render engine. If None, pdfium is bound through `pdfium-auto`.
    pub engine: Option<Arc<dyn RenderEngine>>,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            quality: DEFAULT_QUALITY,
            format: OutputFormat::default(),
            max_workers: DEFAULT_MAX_WORKERS,
            password: None,
            engine: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dpi", &self.dpi)
            .field("quality", &self.quality)
            .field("format", &self.format)
            .field("max_workers", &self.max_workers)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("engine", &self.engine.as_ref().map(|e| e.name().to_string()))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check every field is within range.
    ///
    /// Fields are public, so a config assembled by hand is re-checked here
    /// before each conversion.
    pub fn validate(&self) -> Result<(), Pdf2JpgError> {
        validate_dpi(self.dpi)?;
        validate_quality(self.quality)?;
        if self.max_workers == 0 {
            return Err(Pdf2JpgError::InvalidConfig(
                "max_workers must be ≥ 1".into(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_dpi(dpi: u32) -> Result<(), Pdf2JpgError> {
    if !(MIN_DPI..=MAX_DPI).contains(&dpi) {
        return Err(Pdf2JpgError::InvalidConfig(format!(
            "DPI must be {MIN_DPI}–{MAX_DPI}, got {dpi}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_quality(quality: u8) -> Result<(), Pdf2JpgError> {
    if !(1..=MAX_QUALITY).contains(&quality) {
        return Err(Pdf2JpgError::InvalidConfig(format!(
            "JPEG quality must be 1–{MAX_QUALITY}, got {quality}"
        )));
    }
    Ok(())
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(MIN_DPI, MAX_DPI);
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.config.quality = quality.clamp(1, MAX_QUALITY);
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn max_workers(mut self, n: usize) -> Self {
        self.config.max_workers = n.max(1);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn engine(mut self, engine: Arc<dyn RenderEngine>) -> Self {
        self.config.engine = Some(engine);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2JpgError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Request ──────────────────────────────────────────────────────────────

/// One "convert this file to that directory" call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// PDF to convert.
    pub input: PathBuf,
    /// Directory receiving the page images. Created if absent.
    pub output_dir: PathBuf,
    /// Resolution override; `None` uses [`ConversionConfig::dpi`].
    pub dpi: Option<u32>,
    /// File name prefix; `None` uses the input file stem.
    pub base_name: Option<String>,
}

impl ConversionRequest {
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            dpi: None,
            base_name: None,
        }
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = Some(dpi);
        self
    }

    pub fn with_base_name(mut self, base_name: impl Into<String>) -> Self {
        self.base_name = Some(base_name.into());
        self
    }

    /// Resolution used for this request.
    pub fn effective_dpi(&self, config: &ConversionConfig) -> u32 {
        self.dpi.unwrap_or(config.dpi)
    }

    /// Prefix used for every output file of this request.
    pub fn effective_base_name(&self) -> String {
        match self.base_name {
            Some(ref name) => name.clone(),
            None => default_base_name(&self.input),
        }
    }
}

/// Input file name without its extension, or `"document"` if the path has
/// no file name.
pub fn default_base_name(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string())
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Encoding used for page images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossy JPEG honouring [`ConversionConfig::quality`]. (default)
    #[default]
    Jpeg,
    /// Lossless PNG.
    Png,
}

impl OutputFormat {
    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Jpeg => f.write_str("JPEG"),
            OutputFormat::Png => f.write_str("PNG"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Pdf2JpgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            other => Err(Pdf2JpgError::InvalidConfig(format!(
                "Unsupported output format '{other}' (expected jpeg or png)"
            ))),
        }
    }
}
