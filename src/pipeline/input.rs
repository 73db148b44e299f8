//! Input resolution: check the user-supplied path before the engine sees it.
//!
//! pdfium reports a missing file and a corrupt file the same way, so the
//! distinction the caller cares about (`FileNotFound` vs `InvalidDocument`)
//! is made here. We also check the `%PDF` magic bytes so an image or text
//! file renamed to `.pdf` gets a meaningful error rather than a pdfium one.

use crate::error::Pdf2JpgError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that `path` is an existing, readable PDF.
pub fn resolve_local(path: &Path) -> Result<PathBuf, Pdf2JpgError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(Pdf2JpgError::FileNotFound { path });
    }
    if path.is_dir() {
        return Err(Pdf2JpgError::InvalidDocument {
            path,
            detail: "path is a directory".into(),
        });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_err() {
                return Err(Pdf2JpgError::InvalidDocument {
                    path,
                    detail: "file is too short to be a PDF".into(),
                });
            }
            if &magic != b"%PDF" {
                return Err(Pdf2JpgError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2JpgError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Pdf2JpgError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}
