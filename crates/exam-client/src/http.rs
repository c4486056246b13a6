//! reqwest-backed implementation of [`ExamApi`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response};

use exam_core::config::ServerConfig;
use exam_core::types::{AnswerDraft, Paper, PaperDetail, PaperId, SubmissionReceipt};

use crate::api::ExamApi;
use crate::error::{ClientError, Endpoint};
use crate::wire::{ErrorBody, WirePaper};

/// HTTP client for the paper/answer store.
#[derive(Debug, Clone)]
pub struct HttpExamApi {
    client: Client,
    base_url: String,
}

impl HttpExamApi {
    /// Create a client for the store at `base_url` (e.g. `http://localhost:5000`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ClientError::Transient(format!("failed to build HTTP client: {}", e)))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, ClientError> {
        Self::new(config.base_url.clone(), Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Pass successful responses through; classify everything else.
    async fn check(response: Response, endpoint: Endpoint) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let raw = response.text().await.unwrap_or_default();
        let message = ErrorBody::message_from(&raw);
        tracing::warn!(%endpoint, status = status.as_u16(), %message, "Store request rejected");
        Err(ClientError::from_status(endpoint, status.as_u16(), message))
    }
}

#[async_trait]
impl ExamApi for HttpExamApi {
    async fn list_papers(&self, token: &str) -> Result<Vec<Paper>, ClientError> {
        let response = self
            .client
            .get(self.url("/api/papers"))
            .bearer_auth(token)
            .send()
            .await?;
        let response = Self::check(response, Endpoint::ListPapers).await?;
        let papers: Vec<WirePaper> = response.json().await?;
        tracing::info!(count = papers.len(), "Papers listed");
        Ok(papers.into_iter().map(WirePaper::into_paper).collect())
    }

    async fn get_paper(&self, token: &str, id: &PaperId) -> Result<PaperDetail, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("/api/papers/{}", id)))
            .bearer_auth(token)
            .send()
            .await?;
        let response = Self::check(response, Endpoint::GetPaper).await?;
        let paper: WirePaper = response.json().await?;
        let detail = paper.into_detail()?;
        tracing::info!(
            paper_id = %detail.paper.id,
            questions = detail.questions.len(),
            "Paper loaded"
        );
        Ok(detail)
    }

    async fn submit_answer(
        &self,
        token: &str,
        draft: &AnswerDraft,
    ) -> Result<SubmissionReceipt, ClientError> {
        let response = self
            .client
            .post(self.url("/api/answers"))
            .bearer_auth(token)
            .json(draft)
            .send()
            .await?;
        Self::check(response, Endpoint::SubmitAnswer).await?;
        tracing::info!(
            question_id = %draft.question_id,
            paper_id = %draft.paper_id,
            "Answer accepted"
        );
        Ok(SubmissionReceipt {
            question_id: draft.question_id.clone(),
            paper_id: draft.paper_id.clone(),
            submitted_at: Utc::now(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
