//! Session phase machine.
//!
//! Enforces valid transitions for one exam attempt:
//! - NoPaperSelected -> PapersLoading (fetch papers)
//! - PapersLoading -> PaperPickerReady (papers listed)
//! - PapersLoading -> NoPaperSelected (listing failed)
//! - PaperPickerReady -> PapersLoading (refresh the list)
//! - PaperPickerReady -> QuestionsLoading (paper selected)
//! - QuestionsLoading -> InProgress (questions loaded)
//! - QuestionsLoading -> PaperPickerReady (loading failed or abandoned)
//! - InProgress -> PaperPickerReady (paper abandoned)

use std::fmt;

use crate::error::SessionError;

/// Where the session is in the exam flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// Nothing loaded yet.
    NoPaperSelected,
    /// Paper list requested.
    PapersLoading,
    /// Paper list shown; no paper selected.
    PaperPickerReady,
    /// A paper was selected and its questions are being fetched.
    QuestionsLoading,
    /// Questions loaded; the student is answering.
    InProgress,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::NoPaperSelected => write!(f, "NoPaperSelected"),
            SessionPhase::PapersLoading => write!(f, "PapersLoading"),
            SessionPhase::PaperPickerReady => write!(f, "PaperPickerReady"),
            SessionPhase::QuestionsLoading => write!(f, "QuestionsLoading"),
            SessionPhase::InProgress => write!(f, "InProgress"),
        }
    }
}

impl SessionPhase {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &SessionPhase) -> bool {
        use SessionPhase::*;
        matches!(
            (self, target),
            (NoPaperSelected, PapersLoading)
                | (PapersLoading, PaperPickerReady)
                | (PapersLoading, NoPaperSelected)
                | (PaperPickerReady, PapersLoading)
                | (PaperPickerReady, QuestionsLoading)
                | (QuestionsLoading, InProgress)
                | (QuestionsLoading, PaperPickerReady)
                | (InProgress, PaperPickerReady)
        )
    }

    /// Move to `target` if the transition is valid.
    pub fn transition(&mut self, target: SessionPhase) -> Result<(), SessionError> {
        if self.can_transition_to(&target) {
            tracing::debug!("Session phase: {} -> {}", self, target);
            *self = target;
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                from: *self,
                to: target,
            })
        }
    }
}

/// Submission sub-state while a paper is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionState {
    Idle,
    Submitting,
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionState::Idle => write!(f, "Idle"),
            SubmissionState::Submitting => write!(f, "Submitting"),
        }
    }
}
