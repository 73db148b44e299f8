//! Background conversion worker.
//!
//! [`ConversionWorker`] owns a small tokio runtime whose blocking pool runs
//! the conversion, so the thread that called [`ConversionWorker::start`]
//! never rasterises anything. At most one conversion is in flight per
//! worker.
//!
//! Outcomes come back as [`TaskEvent`]s on a channel rather than as a
//! `Result`: a failed conversion is one more message, never a panic or an
//! error crossing the thread boundary.
//!
//! ```text
//!            start()            Ok
//!   Idle ───────────▶ Running ─────▶ Completed ─┐
//!                        │                      │ start()
//!                        └─────▶ Failed ────────┤
//!                          Err                  ▼
//!                                            Running
//! ```

use crate::config::{ConversionConfig, ConversionRequest};
use crate::convert::convert_sync;
use crate::error::Pdf2JpgError;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Lifecycle of a [`ConversionWorker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Notification emitted by a running conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// Percentage done. Only `100` is ever sent, just before `Finished`.
    Progress(u8),
    /// Every page was written; paths are in page order.
    Finished(Vec<PathBuf>),
    /// Human-readable failure message.
    Failed(String),
}

impl TaskEvent {
    /// `Finished` and `Failed` end the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskEvent::Progress(_))
    }
}

/// Receiving end of one conversion's notifications.
#[derive(Debug)]
pub struct TaskEvents {
    rx: mpsc::UnboundedReceiver<TaskEvent>,
}

impl TaskEvents {
    /// Next event if one is queued. Never blocks; suits a UI loop.
    pub fn try_next(&mut self) -> Option<TaskEvent> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next event. `None` once the stream is exhausted.
    ///
    /// Must not be called from inside an async runtime.
    pub fn blocking_next(&mut self) -> Option<TaskEvent> {
        self.rx.blocking_recv()
    }

    /// Async form of [`TaskEvents::blocking_next`].
    pub async fn next(&mut self) -> Option<TaskEvent> {
        self.rx.recv().await
    }

    /// Block until the terminal event and return it.
    pub fn wait(mut self) -> Option<TaskEvent> {
        while let Some(event) = self.blocking_next() {
            if event.is_terminal() {
                return Some(event);
            }
        }
        None
    }
}

/// Runs conversions off the caller's thread, one at a time.
pub struct ConversionWorker {
    runtime: Runtime,
    state: Arc<Mutex<TaskState>>,
    config: ConversionConfig,
}

impl ConversionWorker {
    /// Build a worker whose blocking pool has `config.max_workers` threads.
    pub fn new(config: ConversionConfig) -> Result<Self, Pdf2JpgError> {
        config.validate()?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(config.max_workers)
            .thread_name("pdf2jpg-worker")
            .enable_all()
            .build()
            .map_err(|e| Pdf2JpgError::Internal(format!("failed to start worker runtime: {e}")))?;

        Ok(Self {
            runtime,
            state: Arc::new(Mutex::new(TaskState::Idle)),
            config,
        })
    }

    pub fn state(&self) -> TaskState {
        *lock(&self.state)
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Start converting `request` in the background.
    ///
    /// # Errors
    /// [`Pdf2JpgError::TaskBusy`] if a conversion is already running. Every
    /// other failure is reported as [`TaskEvent::Failed`].
    pub fn start(&self, request: ConversionRequest) -> Result<TaskEvents, Pdf2JpgError> {
        {
            let mut state = lock(&self.state);
            if *state == TaskState::Running {
                return Err(Pdf2JpgError::TaskBusy);
            }
            *state = TaskState::Running;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::clone(&self.state);
        let config = self.config.clone();

        self.runtime.spawn(async move {
            info!("Background conversion started: {}", request.input.display());
            let joined =
                tokio::task::spawn_blocking(move || convert_sync(&request, &config)).await;

            let outcome = match joined {
                Ok(Ok(output)) => Ok(output.into_paths()),
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) => Err(format!("conversion task panicked: {e}")),
            };

            // The receiver may already be gone; the state is still updated.
            match outcome {
                Ok(paths) => {
                    *lock(&state) = TaskState::Completed;
                    info!("Background conversion finished: {} files", paths.len());
                    let _ = tx.send(TaskEvent::Progress(100));
                    let _ = tx.send(TaskEvent::Finished(paths));
                }
                Err(message) => {
                    *lock(&state) = TaskState::Failed;
                    error!("Background conversion failed: {}", message);
                    let _ = tx.send(TaskEvent::Failed(message));
                }
            }
        });

        Ok(TaskEvents { rx })
    }
}

impl std::fmt::Debug for ConversionWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionWorker")
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}

// A panic while holding the lock cannot leave a half-written enum behind.
fn lock(state: &Mutex<TaskState>) -> MutexGuard<'_, TaskState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}
