//! Voice capture adapters.
//!
//! A capture is started with [`VoiceCapture::start`] and observed through its
//! [`CaptureHandle`]. Whoever produces the transcript holds the matching
//! [`CaptureCompleter`]. Stopping the handle wins over any result the
//! completer delivers afterwards.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, watch};
use uuid::Uuid;

use crate::error::VoiceError;
use crate::recognizer::Recognizer;
use crate::state::{CaptureSlot, CaptureState};

type Outcome = Result<String, VoiceError>;

struct CaptureInner {
    id: Uuid,
    started_at: DateTime<Utc>,
    stop_tx: watch::Sender<bool>,
    outcome_rx: Mutex<Option<oneshot::Receiver<Outcome>>>,
}

impl CaptureInner {
    fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    async fn wait_stopped(&self) {
        let mut rx = self.stop_tx.subscribe();
        // The sender lives as long as `self`, so this only returns once stopped.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

/// Observer side of one capture. Clones refer to the same capture.
#[derive(Clone)]
pub struct CaptureHandle {
    inner: Arc<CaptureInner>,
}

impl fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("id", &self.inner.id)
            .field("started_at", &self.inner.started_at)
            .field("stopped", &self.inner.is_stopped())
            .finish()
    }
}

impl CaptureHandle {
    /// Create a new capture, returning the handle and the producer side.
    pub fn new() -> (CaptureHandle, CaptureCompleter) {
        let (stop_tx, _) = watch::channel(false);
        let (tx, rx) = oneshot::channel();
        let inner = Arc::new(CaptureInner {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            stop_tx,
            outcome_rx: Mutex::new(Some(rx)),
        });
        (
            CaptureHandle {
                inner: Arc::clone(&inner),
            },
            CaptureCompleter { inner, tx },
        )
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    /// Seconds since the capture started.
    pub fn elapsed_secs(&self) -> f32 {
        let elapsed = Utc::now() - self.inner.started_at;
        elapsed.num_milliseconds() as f32 / 1000.0
    }

    /// Cancel the capture. Safe to call repeatedly and after completion.
    pub fn stop(&self) {
        let was_stopped = self.inner.stop_tx.send_replace(true);
        if !was_stopped {
            tracing::info!(
                capture_id = %self.inner.id,
                elapsed_secs = self.elapsed_secs(),
                "Voice capture stopped"
            );
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.is_stopped()
    }

    /// Wait for the single result of this capture.
    ///
    /// Resolves to `Err(VoiceError::Cancelled)` once the capture has been
    /// stopped, whatever the producer delivers. Only the first caller
    /// receives the result; later calls resolve to `Cancelled`.
    pub async fn outcome(&self) -> Outcome {
        let rx = self
            .inner
            .outcome_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(rx) = rx else {
            return Err(VoiceError::Cancelled);
        };

        let result = tokio::select! {
            biased;
            _ = self.inner.wait_stopped() => Err(VoiceError::Cancelled),
            received = rx => received.unwrap_or(Err(VoiceError::Cancelled)),
        };

        if self.is_stopped() {
            Err(VoiceError::Cancelled)
        } else {
            result
        }
    }
}

/// Producer side of one capture.
pub struct CaptureCompleter {
    inner: Arc<CaptureInner>,
    tx: oneshot::Sender<Outcome>,
}

impl CaptureCompleter {
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.is_stopped()
    }

    /// Resolves once the handle has been stopped.
    pub async fn stopped(&self) {
        self.inner.wait_stopped().await
    }

    /// Deliver the result. Returns `false` if it was discarded because the
    /// capture was stopped or nobody is waiting for it.
    pub fn complete(self, result: Outcome) -> bool {
        if self.inner.is_stopped() {
            let _ = self.tx.send(Err(VoiceError::Cancelled));
            return false;
        }
        self.tx.send(result).is_ok()
    }
}

/// A speech-to-text facility producing one transcript per capture.
pub trait VoiceCapture: Send + Sync {
    /// Begin listening. Must be called from within a tokio runtime.
    fn start(&self) -> Result<CaptureHandle, VoiceError>;
}

// =============================================================================
// Recognizer-backed capture
// =============================================================================

/// Capture adapter running a [`Recognizer`] once per capture.
///
/// Only one capture runs at a time; each is bounded by `max_duration`.
pub struct RecognizerCapture<R: Recognizer> {
    recognizer: Arc<R>,
    language: String,
    max_duration: Duration,
    slot: CaptureSlot,
}

impl<R: Recognizer> RecognizerCapture<R> {
    pub fn new(recognizer: R, language: impl Into<String>, max_duration: Duration) -> Self {
        Self {
            recognizer: Arc::new(recognizer),
            language: language.into(),
            max_duration,
            slot: CaptureSlot::new(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.slot.current()
    }
}

impl<R: Recognizer> VoiceCapture for RecognizerCapture<R> {
    fn start(&self) -> Result<CaptureHandle, VoiceError> {
        let (handle, completer) = CaptureHandle::new();
        self.slot.claim(&handle)?;

        tracing::info!(
            capture_id = %handle.id(),
            language = %self.language,
            "Voice capture started"
        );

        let recognizer = Arc::clone(&self.recognizer);
        let language = self.language.clone();
        let max_duration = self.max_duration;
        let slot = self.slot.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = completer.stopped() => Err(VoiceError::Cancelled),
                recognized = tokio::time::timeout(max_duration, recognizer.recognize(&language)) => {
                    match recognized {
                        Ok(result) => result,
                        Err(_) => Err(VoiceError::TimedOut(max_duration.as_secs())),
                    }
                }
            };

            slot.release(completer.id());
            match &result {
                Ok(text) => tracing::debug!(capture_id = %completer.id(), text_len = text.len(), "Transcript ready"),
                Err(e) => tracing::debug!(capture_id = %completer.id(), error = %e, "Capture ended without transcript"),
            }
            completer.complete(result);
        });

        Ok(handle)
    }
}

/// Capture adapter for platforms without speech recognition.
#[derive(Debug, Clone, Default)]
pub struct UnsupportedCapture {
    reason: String,
}

impl UnsupportedCapture {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl VoiceCapture for UnsupportedCapture {
    fn start(&self) -> Result<CaptureHandle, VoiceError> {
        Err(VoiceError::Unsupported(self.reason.clone()))
    }
}

// =============================================================================
// Tests
// =============================================================================
