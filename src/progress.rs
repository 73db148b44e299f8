//! Progress-callback trait for per-page conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to hear about
//! each page as it is rendered and written. The CLI uses this to drive its
//! progress bar. The background worker does not: its own notifications stay
//! coarse (a single jump to 100 % on completion).
//!
//! # Example
//!
//! ```rust
//! use pdf2jpg::{ConversionProgressCallback, ConversionConfig};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     written: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_written(&self, page_num: usize, total_pages: usize, path: &Path) {
//!         self.written.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} → {}", page_num, total_pages, path.display());
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { written: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the conversion pipeline as it processes each page.
///
/// Events arrive from the thread running the conversion, which is not the
/// caller's thread when [`crate::convert::convert`] or the background worker
/// is used. All methods have default no-op implementations.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once the document is open and its page count is known.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after a page has been rasterised (1-indexed).
    fn on_page_rendered(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called after a page image has been written to disk (1-indexed).
    fn on_page_written(&self, page_num: usize, total_pages: usize, path: &Path) {
        let _ = (page_num, total_pages, path);
    }

    /// Called once after every page has been written.
    fn on_conversion_complete(&self, written: usize) {
        let _ = written;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        total: AtomicUsize,
        rendered: AtomicUsize,
        written: Mutex<Vec<String>>,
        completed: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_conversion_start(&self, total_pages: usize) {
            self.total.store(total_pages, Ordering::SeqCst);
        }

        fn on_page_rendered(&self, _page_num: usize, _total_pages: usize) {
            self.rendered.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_written(&self, _page_num: usize, _total_pages: usize, path: &Path) {
            self.written
                .lock()
                .unwrap()
                .push(path.display().to_string());
        }

        fn on_conversion_complete(&self, written: usize) {
            self.completed.store(written, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(2);
        cb.on_page_rendered(1, 2);
        cb.on_page_written(1, 2, Path::new("a_page_1.jpg"));
        cb.on_conversion_complete(2);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_conversion_start(2);
        tracker.on_page_rendered(1, 2);
        tracker.on_page_rendered(2, 2);
        tracker.on_page_written(1, 2, Path::new("doc_page_1.jpg"));
        tracker.on_page_written(2, 2, Path::new("doc_page_2.jpg"));
        tracker.on_conversion_complete(2);

        assert_eq!(tracker.total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.rendered.load(Ordering::SeqCst), 2);
        assert_eq!(
            *tracker.written.lock().unwrap(),
            vec!["doc_page_1.jpg", "doc_page_2.jpg"]
        );
        assert_eq!(tracker.completed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_conversion_start(10);
        cb.on_page_rendered(1, 10);
    }
}
