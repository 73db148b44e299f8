//! Log setup for the `pdf2jpg` binary.
//!
//! Two sinks: the console (stderr) and, optionally, a plain-text log file
//! that is rotated by size. Each sink has its own level so the console can
//! stay quiet behind a progress bar while the file still records every
//! conversion. `RUST_LOG`, when set, overrides both levels.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Default log file name, created in the working directory.
pub const DEFAULT_LOG_FILE: &str = "pdf2jpg_service.log";
/// Rotate once the live file would grow past this.
pub const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;
/// Rotated files kept next to the live one.
pub const DEFAULT_BACKUPS: usize = 3;

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level for stderr, e.g. `"info"` or `"error"`.
    pub console_level: String,
    /// Level for the log file.
    pub file_level: String,
    /// `None` disables the file sink.
    pub log_file: Option<PathBuf>,
    pub max_bytes: u64,
    pub backups: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console_level: "info".into(),
            file_level: "info".into(),
            log_file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            max_bytes: DEFAULT_MAX_BYTES,
            backups: DEFAULT_BACKUPS,
        }
    }
}

/// Install the global subscriber.
///
/// Fails if the log file cannot be opened or a subscriber is already set.
pub fn init(config: &LoggingConfig) -> io::Result<()> {
    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(level_filter(&config.console_level));

    let file = match config.log_file {
        Some(ref path) => {
            let writer = RotatingFileWriter::new(path, config.max_bytes, config.backups)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(level_filter(&config.file_level)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .map_err(io::Error::other)
}

fn level_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

// ── Rotating file writer ─────────────────────────────────────────────────

/// Append-only file that rolls over by size.
///
/// When a write would push the live file past `max_bytes`, the file is
/// renamed to `<name>.1`, older backups shift up by one (`.1` → `.2`, …) and
/// the oldest beyond `backups` is deleted. A single record larger than
/// `max_bytes` is still written whole into a fresh file.
#[derive(Debug)]
pub struct RotatingFileWriter {
    path: PathBuf,
    max_bytes: u64,
    backups: usize,
    state: Mutex<LiveFile>,
}

#[derive(Debug)]
struct LiveFile {
    file: Option<File>,
    size: u64,
}

impl RotatingFileWriter {
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64, backups: usize) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = open_append(&path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            path,
            max_bytes,
            backups,
            state: Mutex::new(LiveFile {
                file: Some(file),
                size,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of rotated file number `n` (1 is the newest).
    pub fn backup_path(&self, n: usize) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }

    fn lock(&self) -> MutexGuard<'_, LiveFile> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn rotate(&self, live: &mut LiveFile) -> io::Result<()> {
        // Close before renaming; Windows refuses to move an open file.
        live.file = None;

        if self.backups == 0 {
            live.file = Some(File::create(&self.path)?);
            live.size = 0;
            return Ok(());
        }

        remove_if_exists(&self.backup_path(self.backups))?;
        for n in (1..self.backups).rev() {
            let from = self.backup_path(n);
            if from.exists() {
                fs::rename(&from, self.backup_path(n + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))?;

        live.file = Some(open_append(&self.path)?);
        live.size = 0;
        Ok(())
    }
}

impl Write for &RotatingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut live = self.lock();
        if live.size > 0 && live.size + buf.len() as u64 > self.max_bytes {
            self.rotate(&mut live)?;
        }
        if live.file.is_none() {
            live.file = Some(open_append(&self.path)?);
            live.size = 0;
        }
        let Some(file) = live.file.as_mut() else {
            return Err(io::Error::other("log file unavailable"));
        };
        // One fmt record per call; keep it whole so size accounting is exact.
        file.write_all(buf)?;
        live.size += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut live = self.lock();
        match live.file.as_mut() {
            Some(f) => f.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for RotatingFileWriter {
    type Writer = &'a RotatingFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_line(w: &RotatingFileWriter, line: &str) {
        let mut handle = w;
        handle.write_all(line.as_bytes()).unwrap();
    }

    #[test]
    fn appends_until_limit() {
        let dir = TempDir::new().unwrap();
        let w = RotatingFileWriter::new(dir.path().join("app.log"), 100, 3).unwrap();
        write_line(&w, "first\n");
        write_line(&w, "second\n");
        assert_eq!(
            fs::read_to_string(w.path()).unwrap(),
            "first\nsecond\n"
        );
        assert!(!w.backup_path(1).exists());
    }

    #[test]
    fn rotates_when_next_write_would_overflow() {
        let dir = TempDir::new().unwrap();
        let w = RotatingFileWriter::new(dir.path().join("app.log"), 10, 3).unwrap();
        write_line(&w, "aaaaaaaa\n"); // 9 bytes
        write_line(&w, "bbbb\n"); // would make 14
        assert_eq!(fs::read_to_string(w.backup_path(1)).unwrap(), "aaaaaaaa\n");
        assert_eq!(fs::read_to_string(w.path()).unwrap(), "bbbb\n");
    }

    #[test]
    fn keeps_at_most_backups_files() {
        let dir = TempDir::new().unwrap();
        let w = RotatingFileWriter::new(dir.path().join("app.log"), 4, 2).unwrap();
        for line in ["one\n", "two\n", "six\n", "ten\n"] {
            write_line(&w, line);
        }
        assert_eq!(fs::read_to_string(w.path()).unwrap(), "ten\n");
        assert_eq!(fs::read_to_string(w.backup_path(1)).unwrap(), "six\n");
        assert_eq!(fs::read_to_string(w.backup_path(2)).unwrap(), "two\n");
        assert!(!w.backup_path(3).exists());
    }

    #[test]
    fn oversize_record_lands_whole_in_fresh_file() {
        let dir = TempDir::new().unwrap();
        let w = RotatingFileWriter::new(dir.path().join("app.log"), 8, 1).unwrap();
        write_line(&w, "x\n");
        write_line(&w, "a record longer than the limit\n");
        assert_eq!(
            fs::read_to_string(w.path()).unwrap(),
            "a record longer than the limit\n"
        );
        assert_eq!(fs::read_to_string(w.backup_path(1)).unwrap(), "x\n");
    }

    #[test]
    fn resumes_size_of_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "12345678").unwrap();
        let w = RotatingFileWriter::new(&path, 10, 1).unwrap();
        write_line(&w, "abc\n");
        assert_eq!(fs::read_to_string(w.backup_path(1)).unwrap(), "12345678");
    }

    #[test]
    fn zero_backups_truncates_in_place() {
        let dir = TempDir::new().unwrap();
        let w = RotatingFileWriter::new(dir.path().join("app.log"), 4, 0).unwrap();
        write_line(&w, "old\n");
        write_line(&w, "new\n");
        assert_eq!(fs::read_to_string(w.path()).unwrap(), "new\n");
        assert!(!w.backup_path(1).exists());
    }

    #[test]
    fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let w = RotatingFileWriter::new(dir.path().join("logs/deep/app.log"), 100, 1).unwrap();
        write_line(&w, "hi\n");
        assert!(w.path().exists());
    }
}
