//! Conversion entry points.
//!
//! [`convert_sync`] is the whole pipeline: rasterise every page, then write
//! every page. The two stages never overlap. [`convert`] runs the same thing
//! on tokio's blocking pool.

use crate::config::{validate_dpi, ConversionConfig, ConversionRequest};
use crate::engine::{PdfiumEngine, RenderEngine};
use crate::error::Pdf2JpgError;
use crate::output::{ConversionOutput, ConversionStats, DocumentMetadata};
use crate::pipeline::{encode, render};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Convert a PDF into one image per page.
///
/// Runs [`convert_sync`] inside `tokio::task::spawn_blocking`.
///
/// # Errors
/// Everything [`convert_sync`] returns, plus [`Pdf2JpgError::Internal`] if
/// the blocking task panicked.
pub async fn convert(
    request: &ConversionRequest,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2JpgError> {
    let request = request.clone();
    let config = config.clone();

    tokio::task::spawn_blocking(move || convert_sync(&request, &config))
        .await
        .map_err(|e| Pdf2JpgError::Internal(format!("Conversion task panicked: {}", e)))?
}

/// Blocking conversion.
///
/// # Returns
/// `Ok(ConversionOutput)` whose `paths` hold one file per page, in page
/// order, named `{base_name}_page_{n}.{ext}`.
///
/// # Errors
/// - [`Pdf2JpgError::FileNotFound`]: input path does not exist; nothing is
///   written
/// - [`Pdf2JpgError::InvalidDocument`]: unreadable or zero-page document
/// - [`Pdf2JpgError::OutputDirFailed`] / [`Pdf2JpgError::OutputWriteFailed`]
///   / [`Pdf2JpgError::EncodeFailed`]: first file that could not be written
pub fn convert_sync(
    request: &ConversionRequest,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2JpgError> {
    let total_start = Instant::now();
    config.validate()?;
    let dpi = request.effective_dpi(config);
    validate_dpi(dpi)?;
    let base_name = request.effective_base_name();

    info!(
        "Starting conversion: {} -> {}",
        request.input.display(),
        request.output_dir.display()
    );

    let engine = resolve_engine(config);

    // ── Step 1: Rasterise every page ─────────────────────────────────────
    let render_start = Instant::now();
    let pages = render::render_document(
        engine.as_ref(),
        &request.input,
        dpi,
        config.password.as_deref(),
        config.progress_callback.as_ref(),
    )?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!("Rendered {} pages in {}ms", pages.len(), render_duration_ms);

    // ── Step 2: Encode and write ─────────────────────────────────────────
    let write_start = Instant::now();
    let total = pages.len();
    let mut bytes_written = 0u64;
    let paths = encode::write_pages_with(
        &pages,
        &request.output_dir,
        &base_name,
        config.quality,
        config.format,
        |page_num, path| {
            bytes_written += std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            if let Some(ref cb) = config.progress_callback {
                cb.on_page_written(page_num, total, path);
            }
        },
    )?;
    let write_duration_ms = write_start.elapsed().as_millis() as u64;

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(paths.len());
    }

    let stats = ConversionStats {
        page_count: total,
        dpi,
        quality: config.quality,
        bytes_written,
        render_duration_ms,
        write_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} ({} pages, {}ms total)",
        request.input.display(),
        total,
        stats.total_duration_ms
    );

    Ok(ConversionOutput {
        paths,
        base_name,
        output_dir: request.output_dir.clone(),
        stats,
    })
}

/// Convert PDF bytes held in memory.
///
/// The bytes are written to a managed [`tempfile`] that is removed when the
/// call returns. A base name is required because there is no meaningful
/// input file name to derive one from.
///
/// # Example
/// ```rust,no_run
/// use pdf2jpg::{convert_from_bytes, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("document.pdf")?;
/// let output = convert_from_bytes(&bytes, "out", "document", &ConversionConfig::default()).await?;
/// println!("{} pages written", output.paths.len());
/// # Ok(())
/// # }
/// ```
pub async fn convert_from_bytes(
    bytes: &[u8],
    output_dir: impl AsRef<Path>,
    base_name: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2JpgError> {
    let mut tmp = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| Pdf2JpgError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| Pdf2JpgError::Internal(format!("tempfile write: {e}")))?;

    let request = ConversionRequest::new(tmp.path(), output_dir.as_ref()).with_base_name(base_name);
    // `tmp` is dropped (and the file deleted) when `convert` returns
    convert(&request, config).await
}

/// Read PDF metadata without rendering any page.
pub async fn inspect(
    pdf_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<DocumentMetadata, Pdf2JpgError> {
    let path = pdf_path.as_ref().to_path_buf();
    let config = config.clone();

    tokio::task::spawn_blocking(move || inspect_sync(&path, &config))
        .await
        .map_err(|e| Pdf2JpgError::Internal(format!("Metadata task panicked: {}", e)))?
}

/// Blocking form of [`inspect`].
pub fn inspect_sync(
    pdf_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<DocumentMetadata, Pdf2JpgError> {
    let engine = resolve_engine(config);
    render::read_metadata(engine.as_ref(), pdf_path.as_ref(), config.password.as_deref())
}

/// Configured engine, or pdfium located automatically.
fn resolve_engine(config: &ConversionConfig) -> Arc<dyn RenderEngine> {
    match config.engine {
        Some(ref engine) => Arc::clone(engine),
        None => Arc::new(PdfiumEngine::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::engine::fake::FakeEngine;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn setup(pages: usize) -> (TempDir, std::path::PathBuf, Arc<FakeEngine>, ConversionConfig) {
        let dir = TempDir::new().unwrap();
        let pdf = dir.path().join("doc.pdf");
        std::fs::write(&pdf, b"%PDF-1.4\n").unwrap();
        let engine = Arc::new(FakeEngine::with_pages(pages));
        let config = ConversionConfig::builder()
            .engine(engine.clone())
            .build()
            .unwrap();
        (dir, pdf, engine, config)
    }

    #[test]
    fn three_page_document_with_defaults() {
        let (dir, pdf, engine, config) = setup(3);
        let out = dir.path().join("out");
        let output = convert_sync(&ConversionRequest::new(&pdf, &out), &config).unwrap();

        let names: Vec<String> = output
            .paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["doc_page_1.jpg", "doc_page_2.jpg", "doc_page_3.jpg"]);
        assert!(output.paths.iter().all(|p| p.exists()));
        assert_eq!(output.base_name, "doc");
        assert_eq!(output.stats.page_count, 3);
        assert_eq!(output.stats.dpi, 150);
        assert!(output.stats.bytes_written > 0);
        assert_eq!(engine.closed(), 1);
    }

    #[test]
    fn nonexistent_input_writes_nothing() {
        let (dir, _pdf, _engine, config) = setup(2);
        let out = dir.path().join("out");
        let err = convert_sync(
            &ConversionRequest::new(dir.path().join("missing.pdf"), &out),
            &config,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!out.exists());
    }

    #[test]
    fn zero_page_document_fails() {
        let (dir, pdf, _engine, config) = setup(0);
        let err = convert_sync(&ConversionRequest::new(&pdf, dir.path()), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDocument);
    }

    #[test]
    fn render_failure_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let pdf = dir.path().join("doc.pdf");
        std::fs::write(&pdf, b"%PDF-1.4\n").unwrap();
        let mut engine = FakeEngine::with_pages(3);
        engine.fail_at = Some(1);
        let config = ConversionConfig::builder()
            .engine(Arc::new(engine))
            .build()
            .unwrap();
        let out = dir.path().join("out");
        assert!(convert_sync(&ConversionRequest::new(&pdf, &out), &config).is_err());
        assert!(!out.exists(), "rasterisation completes before any write");
    }

    #[test]
    fn request_overrides_dpi_and_base_name() {
        let (dir, pdf, _engine, config) = setup(1);
        let req = ConversionRequest::new(&pdf, dir.path())
            .with_dpi(300)
            .with_base_name("scan");
        let output = convert_sync(&req, &config).unwrap();
        assert!(output.paths[0].ends_with("scan_page_1.jpg"));
        // 72x96 pt at 300 DPI
        let img = image::open(&output.paths[0]).unwrap();
        assert_eq!((img.width(), img.height()), (300, 400));
    }

    #[test]
    fn request_dpi_out_of_range_is_rejected() {
        let (dir, pdf, engine, config) = setup(1);
        let req = ConversionRequest::new(&pdf, dir.path()).with_dpi(5);
        let err = convert_sync(&req, &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(engine.opened(), 0);
    }

    #[test]
    fn rerun_overwrites_same_paths() {
        let (dir, pdf, _engine, config) = setup(2);
        let req = ConversionRequest::new(&pdf, dir.path().join("out"));
        let first = convert_sync(&req, &config).unwrap();
        let second = convert_sync(&req, &config).unwrap();
        assert_eq!(first.paths, second.paths);
    }

    #[test]
    fn png_format_from_config() {
        let (dir, pdf, engine, _) = setup(1);
        let config = ConversionConfig::builder()
            .engine(engine)
            .format(OutputFormat::Png)
            .build()
            .unwrap();
        let output = convert_sync(&ConversionRequest::new(&pdf, dir.path()), &config).unwrap();
        assert!(output.paths[0].ends_with("doc_page_1.png"));
    }

    #[tokio::test]
    async fn async_convert_matches_sync() {
        let (dir, pdf, _engine, config) = setup(2);
        let output = convert(&ConversionRequest::new(&pdf, dir.path().join("a")), &config)
            .await
            .unwrap();
        assert_eq!(output.paths.len(), 2);
    }

    #[tokio::test]
    async fn convert_from_bytes_uses_given_base_name() {
        let (dir, _pdf, _engine, config) = setup(2);
        let output = convert_from_bytes(b"%PDF-1.4\n", dir.path().join("b"), "memo", &config)
            .await
            .unwrap();
        assert!(output.paths[0].ends_with("memo_page_1.jpg"));
        assert!(output.paths[1].ends_with("memo_page_2.jpg"));
    }

    #[tokio::test]
    async fn inspect_reports_page_count() {
        let (_dir, pdf, engine, config) = setup(4);
        let meta = inspect(&pdf, &config).await.unwrap();
        assert_eq!(meta.page_count, 4);
        assert_eq!(engine.opened(), 1);
    }
}
