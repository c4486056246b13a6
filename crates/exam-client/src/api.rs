//! The `ExamApi` trait: the session controller's view of the remote store.

use async_trait::async_trait;

use exam_core::types::{AnswerDraft, Paper, PaperDetail, PaperId, SubmissionReceipt};

use crate::error::ClientError;

/// Paper/question reads and answer submission against the remote store.
///
/// Every call takes the bearer token explicitly; the client holds no
/// credential state of its own. Failures are classified so callers can tell
/// a duplicate submission apart from a transient failure.
#[async_trait]
pub trait ExamApi: Send + Sync {
    /// List the papers available to the authenticated student.
    async fn list_papers(&self, token: &str) -> Result<Vec<Paper>, ClientError>;

    /// Fetch one paper with its questions resolved, in paper order.
    async fn get_paper(&self, token: &str, id: &PaperId) -> Result<PaperDetail, ClientError>;

    /// Submit one answer. At most one answer per (student, question, paper)
    /// is accepted; a repeat yields `ClientError::DuplicateSubmission`.
    async fn submit_answer(
        &self,
        token: &str,
        draft: &AnswerDraft,
    ) -> Result<SubmissionReceipt, ClientError>;
}
