//! User-visible notices raised by the session.
//!
//! Notices queue up inside the controller until the front end drains them
//! with `take_notices`. Blocking notices need acknowledgement before the
//! student carries on (the re-authentication prompt, a vanished paper).

use std::fmt;

use exam_client::ClientError;
use exam_voice::VoiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The bearer token was rejected; the student has to sign in again.
    ReauthenticationRequired,
    /// The selected paper no longer exists on the store.
    PaperUnavailable { title: String },
    /// The paper list could not be fetched.
    PapersUnavailable(String),
    /// The questions of the selected paper could not be fetched.
    QuestionsUnavailable(String),
    /// The store already holds an answer for this question.
    AlreadyAnswered,
    SubmissionFailed(String),
    VoiceRecognitionFailed(String),
    /// Speech-to-text is not available on this machine.
    DictationUnavailable(String),
}

impl Notice {
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            Notice::ReauthenticationRequired | Notice::PaperUnavailable { .. }
        )
    }

    /// Notice for a failed paper listing.
    pub(crate) fn for_papers_error(err: &ClientError) -> Self {
        match err {
            ClientError::Unauthorized(_) => Notice::ReauthenticationRequired,
            other => Notice::PapersUnavailable(other.to_string()),
        }
    }

    /// Notice for a failed question fetch of the paper titled `title`.
    pub(crate) fn for_questions_error(err: &ClientError, title: &str) -> Self {
        match err {
            ClientError::Unauthorized(_) => Notice::ReauthenticationRequired,
            ClientError::NotFound(_) => Notice::PaperUnavailable {
                title: title.to_string(),
            },
            other => Notice::QuestionsUnavailable(other.to_string()),
        }
    }

    /// Notice for a failed answer submission on the paper titled `title`.
    pub(crate) fn for_submission_error(err: &ClientError, title: &str) -> Self {
        match err {
            ClientError::DuplicateSubmission(_) => Notice::AlreadyAnswered,
            ClientError::Unauthorized(_) => Notice::ReauthenticationRequired,
            ClientError::NotFound(_) => Notice::PaperUnavailable {
                title: title.to_string(),
            },
            other => Notice::SubmissionFailed(other.to_string()),
        }
    }

    /// Notice for a failed voice capture. Cancellation is not reported.
    pub(crate) fn for_voice_error(err: &VoiceError) -> Option<Self> {
        match err {
            VoiceError::Cancelled => None,
            VoiceError::Unsupported(reason) => Some(Notice::DictationUnavailable(reason.clone())),
            other => Some(Notice::VoiceRecognitionFailed(other.to_string())),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::ReauthenticationRequired => {
                write!(f, "Your session has expired. Please sign in again.")
            }
            Notice::PaperUnavailable { title } => {
                write!(f, "The paper \"{}\" is no longer available.", title)
            }
            Notice::PapersUnavailable(reason) => write!(f, "Failed to load papers ({})", reason),
            Notice::QuestionsUnavailable(reason) => {
                write!(f, "Failed to load questions for this paper ({})", reason)
            }
            Notice::AlreadyAnswered => write!(f, "You may have already answered this question."),
            Notice::SubmissionFailed(reason) => {
                write!(f, "Failed to submit answer ({}). Please try again.", reason)
            }
            Notice::VoiceRecognitionFailed(reason) => {
                write!(f, "Voice recognition failed ({}). Please try again.", reason)
            }
            Notice::DictationUnavailable(reason) => {
                write!(f, "Speech recognition is not supported here: {}", reason)
            }
        }
    }
}
