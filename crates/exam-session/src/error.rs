//! Error types for the session controller.

use exam_core::error::ExamError;
use exam_core::types::PaperId;

use crate::phase::SessionPhase;

/// Errors from driving the session controller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("invalid session transition: {from} -> {to}")]
    InvalidTransition { from: SessionPhase, to: SessionPhase },
    #[error("paper not in the current list: {0}")]
    UnknownPaper(PaperId),
    #[error("invalid key binding: {0}")]
    InvalidKey(String),
}

impl From<SessionError> for ExamError {
    fn from(err: SessionError) -> Self {
        ExamError::Session(err.to_string())
    }
}
