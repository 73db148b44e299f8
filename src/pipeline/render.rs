//! PDF rasterisation: render every page to an RGB bitmap.
//!
//! Pages are rendered one after another, in page order, at
//! `scale = dpi / 72` (72 DPI is one pixel per PDF point). The whole
//! document is rasterised before anything is written, so peak memory is one
//! bitmap per page.
//!
//! The engine may hand back RGBA. Alpha is dropped with a plain channel
//! conversion: no background is composited, whatever the engine painted
//! under transparent regions is what ends up in the image.

use crate::engine::{PageSource, RenderEngine};
use crate::error::Pdf2JpgError;
use crate::pipeline::input;
use crate::progress::ProgressCallback;
use image::{DynamicImage, RgbImage};
use std::path::Path;
use tracing::{debug, info};

/// One rasterised page.
#[derive(Debug, Clone)]
pub struct RasterPage {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Three-channel pixels.
    pub image: RgbImage,
}

impl RasterPage {
    /// Wrap an engine bitmap, flattening it to RGB.
    pub fn from_image(page_num: usize, image: DynamicImage) -> Self {
        let image = match image {
            DynamicImage::ImageRgb8(rgb) => rgb,
            other => other.to_rgb8(),
        };
        Self { page_num, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Scale factor applied to PDF points for a given resolution.
pub fn scale_for_dpi(dpi: u32) -> f32 {
    dpi as f32 / 72.0
}

/// Rasterise every page of the PDF at `pdf_path`.
///
/// # Errors
/// - [`Pdf2JpgError::FileNotFound`] if the path does not exist
/// - [`Pdf2JpgError::InvalidDocument`] if the document cannot be loaded or
///   has no pages
/// - [`Pdf2JpgError::RasterisationFailed`] on the first page that fails
pub fn render_document(
    engine: &dyn RenderEngine,
    pdf_path: &Path,
    dpi: u32,
    password: Option<&str>,
    progress: Option<&ProgressCallback>,
) -> Result<Vec<RasterPage>, Pdf2JpgError> {
    let path = input::resolve_local(pdf_path)?;
    let scale = scale_for_dpi(dpi);
    let mut pages = Vec::new();

    engine.with_document(&path, password, &mut |doc: &dyn PageSource| {
        let total = doc.page_count();
        if total == 0 {
            return Err(Pdf2JpgError::InvalidDocument {
                path: path.clone(),
                detail: "document has no pages".into(),
            });
        }
        info!("PDF loaded: {} pages, rendering at {} DPI", total, dpi);
        if let Some(cb) = progress {
            cb.on_conversion_start(total);
        }

        pages.reserve(total);
        for idx in 0..total {
            let page = RasterPage::from_image(idx + 1, doc.render_page(idx, scale)?);
            debug!(
                "Rendered page {}/{} → {}x{} px",
                idx + 1,
                total,
                page.width(),
                page.height()
            );
            if let Some(cb) = progress {
                cb.on_page_rendered(idx + 1, total);
            }
            pages.push(page);
        }
        Ok(())
    })?;

    Ok(pages)
}

/// Open the document and read its metadata without rendering anything.
pub fn read_metadata(
    engine: &dyn RenderEngine,
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<crate::output::DocumentMetadata, Pdf2JpgError> {
    let path = input::resolve_local(pdf_path)?;
    let mut metadata = None;
    engine.with_document(&path, password, &mut |doc: &dyn PageSource| {
        metadata = Some(doc.metadata());
        Ok(())
    })?;
    metadata.ok_or_else(|| Pdf2JpgError::Internal("engine did not visit the document".into()))
}
