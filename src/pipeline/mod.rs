//! Pipeline stages for PDF-to-image conversion.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──────────▶ encode
//! (path)    (engine, all pages) (JPEG/PNG files)
//! ```
//!
//! 1. [`input`]: check the path exists and looks like a PDF
//! 2. [`render`]: rasterise every page through a [`crate::engine::RenderEngine`]
//! 3. [`encode`]: encode each bitmap and write `{base}_page_{n}.{ext}`
//!
//! Rendering finishes for the whole document before the first file is
//! written, so a document that fails mid-render leaves no output behind.

pub mod encode;
pub mod input;
pub mod render;
