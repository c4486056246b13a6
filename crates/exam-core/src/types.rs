use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Identifiers
// =============================================================================

/// Identity of a paper as assigned by the remote store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperId(pub String);

/// Identity of a question as assigned by the remote store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub String);

impl fmt::Display for PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PaperId {
    fn from(s: &str) -> Self {
        PaperId(s.to_string())
    }
}

impl From<&str> for QuestionId {
    fn from(s: &str) -> Self {
        QuestionId(s.to_string())
    }
}

// =============================================================================
// Questions
// =============================================================================

/// How a question expects to be answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionKind {
    /// Pick one of the listed options.
    #[serde(rename = "mcq")]
    MultipleChoice,
    /// Open-ended answer.
    #[serde(rename = "text")]
    FreeText,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::MultipleChoice => write!(f, "mcq"),
            QuestionKind::FreeText => write!(f, "text"),
        }
    }
}

/// A single prompt within a paper.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: QuestionId,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    /// Option strings in display order. Only meaningful for multiple choice.
    #[serde(default)]
    pub options: Vec<String>,
    /// Canonical answer, shown to the student but never checked locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl Question {
    pub fn is_multiple_choice(&self) -> bool {
        self.kind == QuestionKind::MultipleChoice
    }

    /// Options paired with their letter (`A`, `B`, ...) in list order.
    ///
    /// Empty for free-text questions even if the store sent options.
    pub fn lettered_options(&self) -> Vec<(char, &str)> {
        if !self.is_multiple_choice() {
            return Vec::new();
        }
        self.options
            .iter()
            .enumerate()
            .map(|(i, opt)| (option_letter(i), opt.as_str()))
            .collect()
    }
}

/// Letter for the option at `index`: 0 -> 'A', 1 -> 'B', ...
pub fn option_letter(index: usize) -> char {
    u32::try_from(index)
        .ok()
        .and_then(|i| char::from_u32('A' as u32 + i))
        .unwrap_or('?')
}

// =============================================================================
// Papers
// =============================================================================

/// A named collection of questions taken together as one exam attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: PaperId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Question references in paper order, unique within the paper.
    pub question_ids: Vec<QuestionId>,
}

impl Paper {
    pub fn question_count(&self) -> usize {
        self.question_ids.len()
    }
}

/// A paper together with its resolved questions, in paper order.
#[derive(Clone, Debug, PartialEq)]
pub struct PaperDetail {
    pub paper: Paper,
    pub questions: Vec<Question>,
}

// =============================================================================
// Answers
// =============================================================================

/// Body of an answer submission. The store adds submitter and timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDraft {
    pub question_id: QuestionId,
    pub paper_id: PaperId,
    pub answer_text: String,
}

/// Local record of an accepted submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub question_id: QuestionId,
    pub paper_id: PaperId,
    pub submitted_at: DateTime<Utc>,
}
