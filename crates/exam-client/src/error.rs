//! Error types for the store client and HTTP status classification.

use std::fmt;

use exam_core::error::ExamError;

/// The store endpoint a request was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    ListPapers,
    GetPaper,
    SubmitAnswer,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::ListPapers => write!(f, "GET /api/papers"),
            Endpoint::GetPaper => write!(f, "GET /api/papers/{{id}}"),
            Endpoint::SubmitAnswer => write!(f, "POST /api/answers"),
        }
    }
}

/// Errors from the store client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Missing or invalid bearer token (401/403).
    #[error("authentication required: {0}")]
    Unauthorized(String),
    /// The paper or question no longer exists (404).
    #[error("not found: {0}")]
    NotFound(String),
    /// An answer already exists for this student, question and paper.
    #[error("already answered: {0}")]
    DuplicateSubmission(String),
    /// Network failure or server-side error. Retrying may succeed.
    #[error("request failed: {0}")]
    Transient(String),
    /// The store answered with a body we could not interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Classify a non-success HTTP status for the given endpoint.
    ///
    /// A 400 from the answer endpoint is the store's duplicate-answer
    /// rejection; on the read endpoints it is an ordinary failure.
    pub fn from_status(endpoint: Endpoint, status: u16, message: String) -> Self {
        match (endpoint, status) {
            (_, 401) | (_, 403) => ClientError::Unauthorized(message),
            (_, 404) => ClientError::NotFound(message),
            (Endpoint::SubmitAnswer, 400) => ClientError::DuplicateSubmission(message),
            _ => ClientError::Transient(format!("{} returned {}: {}", endpoint, status, message)),
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, ClientError::DuplicateSubmission(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::InvalidResponse(err.to_string())
        } else {
            ClientError::Transient(err.to_string())
        }
    }
}

impl From<ClientError> for ExamError {
    fn from(err: ClientError) -> Self {
        ExamError::Api(err.to_string())
    }
}
