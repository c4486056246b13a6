//! Error types for voice capture.

use exam_core::error::ExamError;

/// Errors from the voice capture adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoiceError {
    /// No speech-to-text facility on this platform or configuration.
    #[error("speech recognition is not supported: {0}")]
    Unsupported(String),
    #[error("voice capture is already active")]
    AlreadyListening,
    #[error("speech recognition failed: {0}")]
    Recognition(String),
    /// The capture was stopped before it produced a transcript.
    #[error("voice capture was cancelled")]
    Cancelled,
    #[error("voice capture timed out after {0} seconds")]
    TimedOut(u64),
}

impl VoiceError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, VoiceError::Unsupported(_))
    }
}

impl From<VoiceError> for ExamError {
    fn from(err: VoiceError) -> Self {
        ExamError::Voice(err.to_string())
    }
}
