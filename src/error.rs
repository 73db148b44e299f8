//! Error types for the pdf2jpg library.
//!
//! Every failure the library can produce is a [`Pdf2JpgError`]. There is no
//! partial-success path: the rasteriser and the writer stop at the first page
//! or file that fails, and the error travels unchanged up to the caller. The
//! only place an error is turned into something else is
//! [`crate::task::ConversionWorker`], which reports it as a
//! [`crate::task::TaskEvent::Failed`] message.
//!
//! Callers that only care about the broad category (missing input, bad
//! document, I/O trouble) can match on [`Pdf2JpgError::kind`].

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf2jpg library.
#[derive(Debug, Error)]
pub enum Pdf2JpgError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Document errors ───────────────────────────────────────────────────
    /// The document could not be loaded, or it has no pages.
    #[error("Invalid PDF document '{path}': {detail}")]
    InvalidDocument { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The render engine failed on a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The output directory could not be created.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An output image could not be created, written or moved into place.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The image encoder rejected a page.
    #[error("Failed to encode '{path}': {source}")]
    EncodeFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or argument validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
If the auto-download failed, you can:\n\
  • Check your internet connection and try again.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Task errors ───────────────────────────────────────────────────────
    /// A conversion is already running on this worker.
    #[error("A conversion is already in progress")]
    TaskBusy,

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Broad failure category of a [`Pdf2JpgError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input path does not exist.
    NotFound,
    /// The input is not a readable PDF with at least one page.
    InvalidDocument,
    /// Reading the input or writing the output failed at the OS level.
    IoFailure,
    /// A configuration value or argument is out of range.
    Config,
    /// The pdfium library could not be bound.
    Engine,
    /// The worker already has a conversion in flight.
    Busy,
    /// Anything else.
    Internal,
}

impl Pdf2JpgError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound { .. } => ErrorKind::NotFound,
            Self::NotAPdf { .. }
            | Self::InvalidDocument { .. }
            | Self::PasswordRequired { .. }
            | Self::WrongPassword { .. }
            | Self::RasterisationFailed { .. } => ErrorKind::InvalidDocument,
            Self::PermissionDenied { .. }
            | Self::OutputDirFailed { .. }
            | Self::OutputWriteFailed { .. }
            | Self::EncodeFailed { .. } => ErrorKind::IoFailure,
            Self::InvalidConfig(_) => ErrorKind::Config,
            Self::PdfiumBindingFailed(_) => ErrorKind::Engine,
            Self::TaskBusy => ErrorKind::Busy,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<pdfium_auto::PdfiumAutoError> for Pdf2JpgError {
    fn from(e: pdfium_auto::PdfiumAutoError) -> Self {
        Self::PdfiumBindingFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_and_kind() {
        let e = Pdf2JpgError::FileNotFound {
            path: PathBuf::from("/nope/doc.pdf"),
        };
        assert!(e.to_string().contains("/nope/doc.pdf"), "got: {e}");
        assert_eq!(e.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn zero_pages_is_invalid_document() {
        let e = Pdf2JpgError::InvalidDocument {
            path: PathBuf::from("empty.pdf"),
            detail: "document has no pages".into(),
        };
        assert_eq!(e.kind(), ErrorKind::InvalidDocument);
        assert!(e.to_string().contains("no pages"));
    }

    #[test]
    fn write_failure_keeps_source() {
        use std::error::Error as _;
        let e = Pdf2JpgError::OutputWriteFailed {
            path: PathBuf::from("out/doc_page_1.jpg"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        assert_eq!(e.kind(), ErrorKind::IoFailure);
        assert!(e.source().is_some());
        assert!(e.to_string().contains("disk full"));
    }

    #[test]
    fn rasterisation_failure_mentions_page() {
        let e = Pdf2JpgError::RasterisationFailed {
            page: 3,
            detail: "bitmap alloc".into(),
        };
        assert!(e.to_string().contains("page 3"));
        assert_eq!(e.kind(), ErrorKind::InvalidDocument);
    }

    #[test]
    fn busy_kind() {
        assert_eq!(Pdf2JpgError::TaskBusy.kind(), ErrorKind::Busy);
    }
}
