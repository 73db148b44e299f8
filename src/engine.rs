//! Render engine seam: the only place that talks to pdfium.
//!
//! The rasteriser sees a document through two small traits:
//!
//! * [`RenderEngine`] opens a file and hands the open document to a visitor
//!   closure. The document is closed when `with_document` returns, on the
//!   success path and on every error path alike, so a handle can never
//!   outlive the call that opened it.
//! * [`PageSource`] is the open document: page count, per-page rendering at
//!   a scale factor, and metadata.
//!
//! [`PdfiumEngine`] is the production implementation. Tests plug in a fake
//! engine through [`crate::config::ConversionConfig::engine`].

use crate::error::Pdf2JpgError;
use crate::output::DocumentMetadata;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// An open document.
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Rasterise page `index` (0-based) at `scale` pixels per PDF point.
    fn render_page(&self, index: usize, scale: f32) -> Result<DynamicImage, Pdf2JpgError>;

    /// Document properties. Engines without metadata support report only
    /// the page count.
    fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata {
            page_count: self.page_count(),
            ..Default::default()
        }
    }
}

/// Closure receiving the open document.
pub type DocumentVisitor<'v> = dyn FnMut(&dyn PageSource) -> Result<(), Pdf2JpgError> + 'v;

/// Something that can open a PDF and render its pages.
pub trait RenderEngine: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Open `path`, run `visit` on it, then close it.
    ///
    /// The document must be released before this returns, whatever `visit`
    /// returned. Errors from `visit` are passed through unchanged.
    fn with_document(
        &self,
        path: &Path,
        password: Option<&str>,
        visit: &mut DocumentVisitor<'_>,
    ) -> Result<(), Pdf2JpgError>;
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// Render engine backed by the pdfium shared library.
///
/// The library is bound on every `with_document` call, through
/// `pdfium-auto` (environment override, cache, download, then the system
/// library) unless an explicit library path was given.
#[derive(Debug, Clone, Default)]
pub struct PdfiumEngine {
    library_path: Option<PathBuf>,
}

impl PdfiumEngine {
    /// Locate libpdfium automatically.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the pdfium library at `path`.
    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, Pdf2JpgError> {
        let pdfium = match self.library_path {
            Some(ref path) => pdfium_auto::bind_pdfium_from_path(path)?,
            None => pdfium_auto::bind_pdfium_silent()?,
        };
        Ok(pdfium)
    }
}

impl RenderEngine for PdfiumEngine {
    fn name(&self) -> &str {
        "pdfium"
    }

    fn with_document(
        &self,
        path: &Path,
        password: Option<&str>,
        visit: &mut DocumentVisitor<'_>,
    ) -> Result<(), Pdf2JpgError> {
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_file(path, password)
            .map_err(|e| classify_load_error(path, password, e))?;
        debug!("Opened {} with pdfium", path.display());

        let result = visit(&PdfiumPages {
            document: &document,
        });

        drop(document);
        debug!("Closed {}", path.display());
        result
    }
}

fn classify_load_error(path: &Path, password: Option<&str>, e: PdfiumError) -> Pdf2JpgError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            Pdf2JpgError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            Pdf2JpgError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        Pdf2JpgError::InvalidDocument {
            path: path.to_path_buf(),
            detail: err_str,
        }
    }
}

struct PdfiumPages<'a, 'b> {
    document: &'a PdfDocument<'b>,
}

impl PageSource for PdfiumPages<'_, '_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn render_page(&self, index: usize, scale: f32) -> Result<DynamicImage, Pdf2JpgError> {
        let page = self
            .document
            .pages()
            .get(index as u16)
            .map_err(|e| Pdf2JpgError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;

        let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            Pdf2JpgError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            }
        })?;

        Ok(bitmap.as_image())
    }

    fn metadata(&self) -> DocumentMetadata {
        let metadata = self.document.metadata();
        let pages = self.document.pages();

        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        let first_page_size_pt = pages
            .get(0)
            .ok()
            .map(|p| (p.width().value, p.height().value));

        DocumentMetadata {
            page_count: pages.len() as usize,
            first_page_size_pt,
            pdf_version: format!("{:?}", self.document.version()),
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
        }
    }
}

// ── Test double ──────────────────────────────────────────────────────────
