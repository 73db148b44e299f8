//! Result types returned by the conversion entry points.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything a successful conversion produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// One path per page, in page order (`{base_name}_page_{n}.{ext}`).
    pub paths: Vec<PathBuf>,
    /// Prefix used for every file.
    pub base_name: String,
    /// Directory the files were written to.
    pub output_dir: PathBuf,
    /// Timing and size figures.
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// Drop the stats and keep only the written paths.
    pub fn into_paths(self) -> Vec<PathBuf> {
        self.paths
    }
}

/// Figures gathered during a conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub page_count: usize,
    pub dpi: u32,
    pub quality: u8,
    pub bytes_written: u64,
    pub render_duration_ms: u64,
    pub write_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Document properties reported by [`crate::convert::inspect`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub page_count: usize,
    /// Width and height of the first page in PDF points (1/72 inch).
    pub first_page_size_pt: Option<(f32, f32)>,
    pub pdf_version: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
}

impl DocumentMetadata {
    /// Pixel size of the first page when rendered at `dpi`.
    pub fn first_page_pixels(&self, dpi: u32) -> Option<(u32, u32)> {
        let scale = dpi as f32 / 72.0;
        self.first_page_size_pt
            .map(|(w, h)| ((w * scale).round() as u32, (h * scale).round() as u32))
    }
}
