//! JSON shapes served by the store and their conversion into domain types.

use std::collections::HashSet;

use serde::Deserialize;

use exam_core::types::{Paper, PaperDetail, PaperId, Question, QuestionId};

use crate::error::ClientError;

/// A question reference inside a paper: either a bare id or the populated
/// question document.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireQuestionRef {
    Id(QuestionId),
    Populated(Question),
}

impl WireQuestionRef {
    fn id(&self) -> &QuestionId {
        match self {
            WireQuestionRef::Id(id) => id,
            WireQuestionRef::Populated(q) => &q.id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WirePaper {
    #[serde(rename = "_id")]
    pub id: PaperId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<WireQuestionRef>,
}

impl WirePaper {
    /// Drop repeated question references, keeping the first occurrence.
    fn dedup_questions(&mut self) {
        let mut seen = HashSet::new();
        let before = self.questions.len();
        self.questions.retain(|r| seen.insert(r.id().clone()));
        if self.questions.len() != before {
            tracing::warn!(
                paper_id = %self.id,
                dropped = before - self.questions.len(),
                "Paper lists the same question more than once"
            );
        }
    }

    pub fn into_paper(mut self) -> Paper {
        self.dedup_questions();
        Paper {
            question_ids: self.questions.iter().map(|r| r.id().clone()).collect(),
            id: self.id,
            title: self.title,
            description: self.description.unwrap_or_default(),
        }
    }

    /// Convert into a paper with resolved questions.
    ///
    /// Fails if the store returned bare references instead of documents.
    pub fn into_detail(mut self) -> Result<PaperDetail, ClientError> {
        self.dedup_questions();
        let question_ids: Vec<QuestionId> = self.questions.iter().map(|r| r.id().clone()).collect();
        let mut questions = Vec::with_capacity(self.questions.len());
        for reference in self.questions {
            match reference {
                WireQuestionRef::Populated(q) => questions.push(q),
                WireQuestionRef::Id(id) => {
                    return Err(ClientError::InvalidResponse(format!(
                        "paper {} returned unresolved question reference {}",
                        self.id, id
                    )));
                }
            }
        }
        Ok(PaperDetail {
            paper: Paper {
                id: self.id,
                title: self.title,
                description: self.description.unwrap_or_default(),
                question_ids,
            },
            questions,
        })
    }
}

/// Error body returned by the store: `{"error": ...}` or `{"message": ...}`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Best human-readable message from a raw response body.
    pub fn message_from(raw: &str) -> String {
        let body: ErrorBody = serde_json::from_str(raw).unwrap_or_default();
        body.message
            .or(body.error)
            .unwrap_or_else(|| raw.trim().to_string())
    }
}
