//! Exam session crate - the controller that owns an in-progress exam attempt.
//!
//! The controller walks a strict phase machine:
//! NoPaperSelected -> PapersLoading -> PaperPickerReady -> QuestionsLoading -> InProgress,
//! with an Idle/Submitting sub-state while in progress. Network calls and voice
//! captures run as tokio tasks that report back through a completion channel;
//! all session state is mutated by the controller's owner on one logical thread.

pub mod error;
pub mod input;
pub mod notice;
pub mod phase;
pub mod prompt;
pub mod session;

pub use error::SessionError;
pub use input::{Control, Key, KeyBindings, KeyEvent, KeyOutcome};
pub use notice::Notice;
pub use phase::{SessionPhase, SubmissionState};
pub use session::{Completion, ExamSession, SubmitStart};
