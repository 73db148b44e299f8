//! Image encoding and persistence: `RasterPage` → `{base}_page_{n}.jpg`.
//!
//! Pages are numbered by position (the first page handed in becomes
//! `_page_1`), with no zero padding. Existing files with the same name are
//! replaced without warning; re-running a conversion into the same directory
//! simply overwrites its previous output.
//!
//! Each image is encoded into a `.tmp` sibling and renamed over the final
//! name, so an encoder failure never leaves a truncated image behind under a
//! name that looks finished.

use crate::config::{validate_quality, OutputFormat};
use crate::error::Pdf2JpgError;
use crate::pipeline::render::RasterPage;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of page `page_num` (1-indexed).
pub fn page_file_name(base_name: &str, page_num: usize, format: OutputFormat) -> String {
    format!("{}_page_{}.{}", base_name, page_num, format.extension())
}

/// Encode and write every page, returning the written paths in page order.
///
/// Creates `output_dir` (and parents) when missing. Stops at the first file
/// that fails.
pub fn write_pages(
    pages: &[RasterPage],
    output_dir: &Path,
    base_name: &str,
    quality: u8,
    format: OutputFormat,
) -> Result<Vec<PathBuf>, Pdf2JpgError> {
    write_pages_with(pages, output_dir, base_name, quality, format, |_, _| {})
}

/// [`write_pages`] with a hook called after each file lands on disk.
pub(crate) fn write_pages_with(
    pages: &[RasterPage],
    output_dir: &Path,
    base_name: &str,
    quality: u8,
    format: OutputFormat,
    mut on_written: impl FnMut(usize, &Path),
) -> Result<Vec<PathBuf>, Pdf2JpgError> {
    validate_quality(quality)?;
    validate_base_name(base_name)?;

    std::fs::create_dir_all(output_dir).map_err(|e| Pdf2JpgError::OutputDirFailed {
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    let mut saved = Vec::with_capacity(pages.len());
    for (i, page) in pages.iter().enumerate() {
        let page_num = i + 1;
        let out_path = output_dir.join(page_file_name(base_name, page_num, format));
        debug!("Saving image: {}", out_path.display());
        write_image(page, &out_path, quality, format)?;
        on_written(page_num, &out_path);
        saved.push(out_path);
    }

    info!("Saved {} files to {}", saved.len(), output_dir.display());
    Ok(saved)
}

/// Encode one page into `buf`.
pub fn encode_page<W: Write>(
    page: &RasterPage,
    buf: W,
    quality: u8,
    format: OutputFormat,
) -> Result<(), image::ImageError> {
    let (w, h) = (page.width(), page.height());
    let raw = page.image.as_raw();
    match format {
        OutputFormat::Jpeg => JpegEncoder::new_with_quality(buf, quality).write_image(
            raw,
            w,
            h,
            ExtendedColorType::Rgb8,
        ),
        OutputFormat::Png => PngEncoder::new(buf).write_image(raw, w, h, ExtendedColorType::Rgb8),
    }
}

fn write_image(
    page: &RasterPage,
    out_path: &Path,
    quality: u8,
    format: OutputFormat,
) -> Result<(), Pdf2JpgError> {
    let tmp_path = tmp_sibling(out_path);
    let write_failed = |source| Pdf2JpgError::OutputWriteFailed {
        path: out_path.to_path_buf(),
        source,
    };

    let file = File::create(&tmp_path).map_err(write_failed)?;
    let mut writer = BufWriter::new(file);

    if let Err(source) = encode_page(page, &mut writer, quality, format) {
        drop(writer);
        let _ = std::fs::remove_file(&tmp_path);
        return Err(Pdf2JpgError::EncodeFailed {
            path: out_path.to_path_buf(),
            source,
        });
    }

    let flushed = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .and_then(|f| f.sync_all());
    if let Err(e) = flushed {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(write_failed(e));
    }

    std::fs::rename(&tmp_path, out_path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        write_failed(e)
    })
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn validate_base_name(base_name: &str) -> Result<(), Pdf2JpgError> {
    if base_name.is_empty() {
        return Err(Pdf2JpgError::InvalidConfig("base name must not be empty".into()));
    }
    if base_name.contains(['/', '\\']) {
        return Err(Pdf2JpgError::InvalidConfig(format!(
            "base name '{base_name}' must not contain path separators"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn page(n: usize, w: u32, h: u32) -> RasterPage {
        RasterPage {
            page_num: n,
            image: RgbImage::from_pixel(w, h, Rgb([200, 30, 30])),
        }
    }

    #[test]
    fn names_are_one_indexed_without_padding() {
        assert_eq!(page_file_name("doc", 1, OutputFormat::Jpeg), "doc_page_1.jpg");
        assert_eq!(page_file_name("doc", 10, OutputFormat::Jpeg), "doc_page_10.jpg");
        assert_eq!(page_file_name("scan", 2, OutputFormat::Png), "scan_page_2.png");
    }

    #[test]
    fn writes_valid_jpegs_in_order() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested/out");
        let pages = vec![page(1, 20, 10), page(2, 30, 15), page(3, 40, 20)];

        let paths = write_pages(&pages, &out, "doc", 85, OutputFormat::Jpeg).unwrap();

        assert_eq!(paths.len(), 3);
        for (i, p) in paths.iter().enumerate() {
            assert_eq!(
                p.file_name().unwrap().to_str().unwrap(),
                format!("doc_page_{}.jpg", i + 1)
            );
            let img = image::open(p).expect("valid image");
            assert_eq!(img.width(), pages[i].width());
            assert_eq!(
                image::ImageFormat::from_path(p).unwrap(),
                image::ImageFormat::Jpeg
            );
        }
        // No temp files left behind
        let leftovers = std::fs::read_dir(&out)
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .path()
                    .extension()
                    .is_some_and(|x| x == "tmp")
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn numbering_follows_position_not_page_num() {
        let dir = TempDir::new().unwrap();
        let pages = vec![page(7, 4, 4), page(9, 4, 4)];
        let paths = write_pages(&pages, dir.path(), "x", 50, OutputFormat::Jpeg).unwrap();
        assert!(paths[0].ends_with("x_page_1.jpg"));
        assert!(paths[1].ends_with("x_page_2.jpg"));
    }

    #[test]
    fn rerun_overwrites_silently() {
        let dir = TempDir::new().unwrap();
        let first = write_pages(&[page(1, 8, 8)], dir.path(), "doc", 85, OutputFormat::Jpeg)
            .unwrap();
        let second = write_pages(&[page(1, 16, 16)], dir.path(), "doc", 85, OutputFormat::Jpeg)
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(image::open(&second[0]).unwrap().width(), 16);
    }

    #[test]
    fn existing_output_dir_is_fine() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("out")).unwrap();
        let paths = write_pages(
            &[page(1, 4, 4)],
            &dir.path().join("out"),
            "doc",
            85,
            OutputFormat::Jpeg,
        )
        .unwrap();
        assert!(paths[0].exists());
    }

    #[test]
    fn png_format_uses_png_extension() {
        let dir = TempDir::new().unwrap();
        let paths = write_pages(&[page(1, 5, 5)], dir.path(), "doc", 85, OutputFormat::Png)
            .unwrap();
        assert!(paths[0].ends_with("doc_page_1.png"));
        assert_eq!(
            image::open(&paths[0]).unwrap().to_rgb8().get_pixel(0, 0).0,
            [200, 30, 30]
        );
    }

    #[test]
    fn quality_out_of_range_is_rejected() {
        let dir = TempDir::new().unwrap();
        for q in [0u8, 96, 255] {
            let err = write_pages(&[page(1, 4, 4)], dir.path(), "doc", q, OutputFormat::Jpeg)
                .unwrap_err();
            assert!(matches!(err, Pdf2JpgError::InvalidConfig(_)), "quality {q}");
        }
    }

    #[test]
    fn lower_quality_gives_smaller_file() {
        let dir = TempDir::new().unwrap();
        let mut img = RgbImage::new(64, 64);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = Rgb([(x * 4) as u8, (y * 4) as u8, ((x ^ y) * 4) as u8]);
        }
        let pages = vec![RasterPage { page_num: 1, image: img }];
        let lo = write_pages(&pages, &dir.path().join("lo"), "d", 10, OutputFormat::Jpeg).unwrap();
        let hi = write_pages(&pages, &dir.path().join("hi"), "d", 95, OutputFormat::Jpeg).unwrap();
        let size = |p: &Path| std::fs::metadata(p).unwrap().len();
        assert!(size(&lo[0]) < size(&hi[0]));
    }

    #[test]
    fn bad_base_names_are_rejected() {
        let dir = TempDir::new().unwrap();
        for name in ["", "../escape", "a\\b"] {
            assert!(write_pages(&[page(1, 4, 4)], dir.path(), name, 85, OutputFormat::Jpeg)
                .is_err());
        }
    }

    #[test]
    fn output_dir_that_is_a_file_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let err = write_pages(&[page(1, 4, 4)], &blocker, "doc", 85, OutputFormat::Jpeg)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::IoFailure);
    }

    #[test]
    fn empty_page_list_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let paths = write_pages(&[], dir.path(), "doc", 85, OutputFormat::Jpeg).unwrap();
        assert!(paths.is_empty());
    }
}
