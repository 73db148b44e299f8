//! # pdfium-auto
//!
//! Find a usable [PDFium](https://pdfium.googlesource.com/pdfium/) shared
//! library at runtime so `pdfium-render` users never set
//! `LD_LIBRARY_PATH` / `DYLD_LIBRARY_PATH` by hand.
//!
//! ## Resolution order
//!
//! 1. `PDFIUM_LIB_PATH`, when it names an existing file.
//! 2. The per-version cache directory (see [`pdfium_cache_dir`]).
//! 3. A download of the platform archive from
//!    [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries),
//!    extracted into the cache.
//! 4. Binding: the resolved file, or the system library if steps 1–3
//!    produced nothing (unsupported platform, no network).
//!
//! [`LibrarySource`] tells the caller which step won.
//!
//! ```rust,no_run
//! use pdfium_auto::{bind_pdfium_with_source, ensure_pdfium_library};
//!
//! // Fetch up front with a progress hook...
//! ensure_pdfium_library(Some(&|done, total| {
//!     if let Some(t) = total {
//!         eprint!("\rPDFium: {done}/{t} bytes");
//!     }
//! }))
//! .expect("download failed");
//!
//! // ...then bind.
//! let (_pdfium, source) = bind_pdfium_with_source(None).expect("PDFium unavailable");
//! println!("using {source}");
//! ```
//!
//! ## Environment variables
//!
//! - `PDFIUM_LIB_PATH`: existing library to use; skips cache and download.
//! - `PDFIUM_AUTO_CACHE_DIR`: cache root instead of the OS cache dir.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pdfium_render::prelude::Pdfium;
use thiserror::Error;

/// pdfium-binaries release tag used for downloads.
pub const PDFIUM_VERSION: &str = "7690";

const BASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Directory name under the OS cache dir.
const CACHE_NAMESPACE: &str = "pdf2jpg";

/// Errors returned by pdfium-auto operations.
#[derive(Error, Debug)]
pub enum PdfiumAutoError {
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Cache directory error: {0}")]
    CacheDir(#[source] std::io::Error),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Archive extraction failed: {0}")]
    Extract(String),

    #[error("Failed to bind PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },

    /// Neither a resolved file nor the system library could be loaded.
    #[error("No usable PDFium library: {resolve}; system library: {system}")]
    Unavailable { resolve: String, system: String },
}

/// Where the bound library came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibrarySource {
    /// `PDFIUM_LIB_PATH`.
    EnvOverride(PathBuf),
    /// Found in the cache directory.
    Cached(PathBuf),
    /// Downloaded during this process.
    Downloaded(PathBuf),
    /// The platform's default library search path.
    System,
}

impl LibrarySource {
    /// File the library was loaded from, if it was not the system one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            LibrarySource::EnvOverride(p)
            | LibrarySource::Cached(p)
            | LibrarySource::Downloaded(p) => Some(p.as_path()),
            LibrarySource::System => None,
        }
    }
}

impl fmt::Display for LibrarySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibrarySource::EnvOverride(p) => write!(f, "PDFIUM_LIB_PATH ({})", p.display()),
            LibrarySource::Cached(p) => write!(f, "cache ({})", p.display()),
            LibrarySource::Downloaded(p) => write!(f, "download ({})", p.display()),
            LibrarySource::System => f.write_str("system library"),
        }
    }
}

// ── Platform table ───────────────────────────────────────────────────────

struct Platform {
    os: &'static str,
    arch: &'static str,
    /// Release asset name, e.g. `pdfium-mac-arm64.tgz`.
    archive: &'static str,
    /// Path of the library inside the archive.
    member: &'static str,
    /// File name on disk.
    lib_name: &'static str,
}

const PLATFORMS: &[Platform] = &[
    Platform {
        os: "macos",
        arch: "aarch64",
        archive: "pdfium-mac-arm64.tgz",
        member: "lib/libpdfium.dylib",
        lib_name: "libpdfium.dylib",
    },
    Platform {
        os: "macos",
        arch: "x86_64",
        archive: "pdfium-mac-x64.tgz",
        member: "lib/libpdfium.dylib",
        lib_name: "libpdfium.dylib",
    },
    Platform {
        os: "linux",
        arch: "x86_64",
        archive: "pdfium-linux-x64.tgz",
        member: "lib/libpdfium.so",
        lib_name: "libpdfium.so",
    },
    Platform {
        os: "linux",
        arch: "aarch64",
        archive: "pdfium-linux-arm64.tgz",
        member: "lib/libpdfium.so",
        lib_name: "libpdfium.so",
    },
    Platform {
        os: "windows",
        arch: "x86_64",
        archive: "pdfium-win-x64.tgz",
        member: "bin/pdfium.dll",
        lib_name: "pdfium.dll",
    },
    Platform {
        os: "windows",
        arch: "aarch64",
        archive: "pdfium-win-arm64.tgz",
        member: "bin/pdfium.dll",
        lib_name: "pdfium.dll",
    },
    Platform {
        os: "windows",
        arch: "x86",
        archive: "pdfium-win-x86.tgz",
        member: "bin/pdfium.dll",
        lib_name: "pdfium.dll",
    },
];

fn platform_for(os: &str, arch: &str) -> Result<&'static Platform, PdfiumAutoError> {
    PLATFORMS
        .iter()
        .find(|p| p.os == os && p.arch == arch)
        .ok_or_else(|| PdfiumAutoError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        })
}

fn current_platform() -> Result<&'static Platform, PdfiumAutoError> {
    platform_for(std::env::consts::OS, std::env::consts::ARCH)
}

// ── Cache ────────────────────────────────────────────────────────────────

/// Per-version cache directory for the library.
///
/// - **Linux**: `~/.cache/pdf2jpg/pdfium-{VERSION}/`
/// - **macOS**: `~/Library/Caches/pdf2jpg/pdfium-{VERSION}/`
/// - **Windows**: `%LOCALAPPDATA%\pdf2jpg\pdfium-{VERSION}\`
///
/// `PDFIUM_AUTO_CACHE_DIR` replaces the `…/pdf2jpg` root.
pub fn pdfium_cache_dir() -> PathBuf {
    let version_dir = format!("pdfium-{PDFIUM_VERSION}");
    if let Ok(root) = std::env::var("PDFIUM_AUTO_CACHE_DIR") {
        return PathBuf::from(root).join(version_dir);
    }

    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir)
        .join(CACHE_NAMESPACE)
        .join(version_dir)
}

fn env_override() -> Option<PathBuf> {
    std::env::var_os("PDFIUM_LIB_PATH")
        .map(PathBuf::from)
        .filter(|p| p.exists())
}

/// Library already on disk, from the environment override or the cache.
pub fn cached_pdfium_path() -> Option<PathBuf> {
    if let Some(p) = env_override() {
        return Some(p);
    }
    let platform = current_platform().ok()?;
    Some(pdfium_cache_dir().join(platform.lib_name)).filter(|p| p.exists())
}

/// `true` when no network access is needed to get a library file.
pub fn is_pdfium_cached() -> bool {
    cached_pdfium_path().is_some()
}

// ── Resolution ───────────────────────────────────────────────────────────

static RESOLVED: OnceLock<LibrarySource> = OnceLock::new();

/// Make sure a library file is on disk and return where it is.
///
/// Uses `PDFIUM_LIB_PATH` or the cache when possible, otherwise downloads.
/// `on_progress` receives `(bytes_downloaded, total_bytes)` during a
/// download. The result is remembered for the rest of the process.
pub fn ensure_pdfium_library(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, PdfiumAutoError> {
    let source = resolve_library(on_progress)?;
    source
        .path()
        .map(Path::to_path_buf)
        .ok_or_else(|| PdfiumAutoError::Download("no library file was resolved".into()))
}

/// Steps 1–3 of the resolution order, without binding.
pub fn resolve_library(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<LibrarySource, PdfiumAutoError> {
    if let Some(source) = RESOLVED.get() {
        return Ok(source.clone());
    }
    let source = locate_or_download(on_progress)?;
    // Two threads racing here resolve to the same file; either value is fine.
    let _ = RESOLVED.set(source.clone());
    Ok(source)
}

fn locate_or_download(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<LibrarySource, PdfiumAutoError> {
    // A PDFIUM_LIB_PATH that does not exist falls through to the cache.
    if let Some(p) = env_override() {
        return Ok(LibrarySource::EnvOverride(p));
    }

    let platform = current_platform()?;
    let cache_dir = pdfium_cache_dir();
    let lib_path = cache_dir.join(platform.lib_name);
    if lib_path.exists() {
        return Ok(LibrarySource::Cached(lib_path));
    }

    let url = format!("{BASE_URL}/chromium%2F{PDFIUM_VERSION}/{}", platform.archive);
    std::fs::create_dir_all(&cache_dir).map_err(PdfiumAutoError::CacheDir)?;
    let archive = download_bytes(&url, on_progress)?;
    extract_member(&archive, platform.member, &lib_path)?;
    Ok(LibrarySource::Downloaded(lib_path))
}

// ── Binding ──────────────────────────────────────────────────────────────

/// Bind PDFium and report where it came from.
///
/// Falls back to the system library when no file could be resolved.
pub fn bind_pdfium_with_source(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<(Pdfium, LibrarySource), PdfiumAutoError> {
    match resolve_library(on_progress) {
        Ok(source) => {
            let pdfium = match source.path() {
                Some(path) => bind_pdfium_from_path(path)?,
                None => bind_system()?,
            };
            Ok((pdfium, source))
        }
        Err(resolve_err) => match bind_system() {
            Ok(pdfium) => Ok((pdfium, LibrarySource::System)),
            Err(system_err) => Err(PdfiumAutoError::Unavailable {
                resolve: resolve_err.to_string(),
                system: system_err.to_string(),
            }),
        },
    }
}

/// Bind PDFium, downloading it first if necessary.
pub fn bind_pdfium(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Pdfium, PdfiumAutoError> {
    bind_pdfium_with_source(on_progress).map(|(pdfium, _)| pdfium)
}

/// [`bind_pdfium`] without progress reporting.
pub fn bind_pdfium_silent() -> Result<Pdfium, PdfiumAutoError> {
    bind_pdfium(None)
}

/// Bind the library at `path`. Never touches the cache or the network.
pub fn bind_pdfium_from_path(path: &Path) -> Result<Pdfium, PdfiumAutoError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| PdfiumAutoError::Bind {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn bind_system() -> Result<Pdfium, PdfiumAutoError> {
    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| PdfiumAutoError::Bind {
            path: PathBuf::from(Pdfium::pdfium_platform_library_name()),
            reason: e.to_string(),
        })
}

// ── Download & extract ───────────────────────────────────────────────────

/// Read `url` into memory, calling `on_progress` after every 64 KiB chunk.
fn download_bytes(
    url: &str,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Vec<u8>, PdfiumAutoError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdfium-auto/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| PdfiumAutoError::Download(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| PdfiumAutoError::Download(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(PdfiumAutoError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let mut buf = Vec::with_capacity(total.unwrap_or(32 * 1024 * 1024) as usize);
    let mut chunk = vec![0u8; 64 * 1024];
    let mut downloaded = 0u64;

    loop {
        match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                downloaded += n as u64;
                if let Some(cb) = on_progress {
                    cb(downloaded, total);
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(PdfiumAutoError::Download(format!("Read error: {e}"))),
        }
    }

    Ok(buf)
}

/// Unpack one member of a `.tgz` into `dest`.
///
/// The file is unpacked next to `dest` and renamed into place, so an
/// interrupted extraction never leaves a truncated library in the cache.
fn extract_member(archive: &[u8], member: &str, dest: &Path) -> Result<(), PdfiumAutoError> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    let extract_err = |e: std::io::Error| PdfiumAutoError::Extract(e.to_string());
    let mut partial = dest.as_os_str().to_os_string();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    let mut tar = Archive::new(GzDecoder::new(archive));
    for entry in tar.entries().map_err(extract_err)? {
        let mut entry = entry.map_err(extract_err)?;
        let is_member = entry.path().map_err(extract_err)?.to_string_lossy() == member;
        if is_member {
            entry
                .unpack(&partial)
                .map_err(|e| PdfiumAutoError::Extract(format!("Unpack failed: {e}")))?;
            return std::fs::rename(&partial, dest).map_err(|e| {
                let _ = std::fs::remove_file(&partial);
                PdfiumAutoError::Extract(format!("Move into cache failed: {e}"))
            });
        }
    }

    Err(PdfiumAutoError::Extract(format!(
        "Library '{member}' not found in archive"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    fn tgz_with(files: &[(&str, &[u8])]) -> Vec<u8> {
        let gz = GzEncoder::new(Vec::new(), Compression::fast());
        let mut builder = tar::Builder::new(gz);
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn current_platform_is_in_table() {
        current_platform().expect("current platform should be supported");
    }

    #[test]
    fn platform_lookup() {
        let p = platform_for("linux", "x86_64").unwrap();
        assert_eq!(p.archive, "pdfium-linux-x64.tgz");
        assert_eq!(p.lib_name, "libpdfium.so");
        assert!(matches!(
            platform_for("plan9", "mips"),
            Err(PdfiumAutoError::UnsupportedPlatform { .. })
        ));
    }

    #[test]
    fn every_platform_entry_is_complete() {
        for p in PLATFORMS {
            assert!(p.archive.ends_with(".tgz"));
            assert!(p.member.ends_with(p.lib_name), "{}", p.member);
        }
    }

    #[test]
    fn cache_dir_default_and_override() {
        let default = pdfium_cache_dir();
        if std::env::var_os("PDFIUM_AUTO_CACHE_DIR").is_none() {
            assert!(default.to_string_lossy().contains(CACHE_NAMESPACE));
        }
        assert!(default.ends_with(format!("pdfium-{PDFIUM_VERSION}")));

        std::env::set_var("PDFIUM_AUTO_CACHE_DIR", "/tmp/pdfium_auto_override");
        let overridden = pdfium_cache_dir();
        std::env::remove_var("PDFIUM_AUTO_CACHE_DIR");
        assert_eq!(
            overridden,
            PathBuf::from("/tmp/pdfium_auto_override").join(format!("pdfium-{PDFIUM_VERSION}"))
        );
    }

    #[test]
    fn extracts_named_member_only() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("libpdfium.so");
        let archive = tgz_with(&[
            ("include/fpdfview.h", b"header"),
            ("lib/libpdfium.so", b"\x7fELF fake"),
        ]);

        extract_member(&archive, "lib/libpdfium.so", &dest).unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"\x7fELF fake");
        assert!(!dir.path().join("libpdfium.so.part").exists());
    }

    #[test]
    fn missing_member_is_an_error() {
        let dir = TempDir::new().unwrap();
        let archive = tgz_with(&[("lib/other.so", b"x")]);
        let err = extract_member(&archive, "lib/libpdfium.so", &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, PdfiumAutoError::Extract(_)));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn source_paths_and_display() {
        let p = PathBuf::from("/opt/libpdfium.so");
        assert_eq!(LibrarySource::Cached(p.clone()).path(), Some(p.as_path()));
        assert_eq!(LibrarySource::System.path(), None);
        assert_eq!(LibrarySource::System.to_string(), "system library");
        assert!(LibrarySource::EnvOverride(p)
            .to_string()
            .starts_with("PDFIUM_LIB_PATH"));
    }

    #[test]
    fn binding_a_missing_file_fails() {
        let err = bind_pdfium_from_path(Path::new("/nonexistent/libpdfium.so")).unwrap_err();
        assert!(matches!(err, PdfiumAutoError::Bind { .. }));
    }
}
