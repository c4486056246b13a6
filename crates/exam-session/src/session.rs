//! The exam session controller.
//!
//! [`ExamSession`] is the single owner of an exam attempt: the paper list, the
//! selected paper and its questions, the local answers, the cursor and the
//! dictation/submission flags. Side effects run as spawned tokio tasks which
//! never touch session state; each posts one [`Completion`] back, and the
//! owner feeds it to [`ExamSession::apply`] (or calls [`ExamSession::pump`]).
//!
//! Completions are tagged with the attempt id that issued them, and
//! dictation completions with their capture id. Anything that no longer
//! matches the live attempt or capture is dropped.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use exam_client::{ClientError, ExamApi};
use exam_core::types::{AnswerDraft, Paper, PaperDetail, PaperId, Question, QuestionId, SubmissionReceipt};
use exam_voice::{CaptureHandle, CompletionCue, SpeechOutput, VoiceCapture, VoiceError};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::SessionError;
use crate::input::{Control, KeyBindings, KeyEvent, KeyOutcome};
use crate::notice::Notice;
use crate::phase::{SessionPhase, SubmissionState};
use crate::prompt;

/// Result of one piece of background work.
#[derive(Debug)]
pub enum Completion {
    PapersLoaded(Result<Vec<Paper>, ClientError>),
    QuestionsLoaded {
        attempt: Uuid,
        result: Result<PaperDetail, ClientError>,
    },
    Submitted {
        attempt: Uuid,
        /// Position of the submitted question when the submission started.
        index: usize,
        question_id: QuestionId,
        result: Result<SubmissionReceipt, ClientError>,
    },
    Dictated {
        capture: Uuid,
        result: Result<String, VoiceError>,
    },
}

/// What `submit_current` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStart {
    /// The submission is on its way.
    Started,
    /// Another submission is still outstanding; nothing was sent.
    AlreadySubmitting,
    /// The current question has no answer text; nothing was sent.
    NoAnswer,
    /// No paper is in progress.
    NotInProgress,
}

/// One attempt at one paper.
struct Attempt {
    id: Uuid,
    paper: Paper,
    questions: Vec<Question>,
    answers: HashMap<QuestionId, String>,
    cursor: Option<usize>,
    submission: SubmissionState,
}

impl Attempt {
    fn new(paper: Paper) -> Self {
        Self {
            id: Uuid::new_v4(),
            paper,
            questions: Vec::new(),
            answers: HashMap::new(),
            cursor: None,
            submission: SubmissionState::Idle,
        }
    }

    fn current(&self) -> Option<(usize, &Question)> {
        let index = self.cursor?;
        self.questions.get(index).map(|q| (index, q))
    }

    /// Store `text` for a loaded question. Empty text clears the answer.
    fn set_answer(&mut self, question_id: &QuestionId, text: String) -> bool {
        if !self.questions.iter().any(|q| &q.id == question_id) {
            tracing::debug!(question_id = %question_id, "Ignoring answer for unknown question");
            return false;
        }
        if text.is_empty() {
            self.answers.remove(question_id);
        } else {
            self.answers.insert(question_id.clone(), text);
        }
        true
    }
}

/// The capture currently listening, and the question it was started on.
struct Dictation {
    handle: CaptureHandle,
    attempt: Uuid,
    question_id: QuestionId,
}

/// Controller for one student's exam session.
pub struct ExamSession {
    api: Arc<dyn ExamApi>,
    voice: Arc<dyn VoiceCapture>,
    speech: Arc<dyn SpeechOutput>,
    cue: Arc<dyn CompletionCue>,
    token: String,
    bindings: KeyBindings,

    phase: SessionPhase,
    papers: Vec<Paper>,
    attempt: Option<Attempt>,
    dictation: Option<Dictation>,
    dictation_disabled: bool,
    notices: Vec<Notice>,

    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl ExamSession {
    pub fn new(
        api: Arc<dyn ExamApi>,
        voice: Arc<dyn VoiceCapture>,
        speech: Arc<dyn SpeechOutput>,
        cue: Arc<dyn CompletionCue>,
        token: impl Into<String>,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            api,
            voice,
            speech,
            cue,
            token: token.into(),
            bindings: KeyBindings::default(),
            phase: SessionPhase::NoPaperSelected,
            papers: Vec::new(),
            attempt: None,
            dictation: None,
            dictation_disabled: false,
            notices: Vec::new(),
            completions_tx,
            completions_rx,
        }
    }

    pub fn with_bindings(mut self, bindings: KeyBindings) -> Self {
        self.bindings = bindings;
        self
    }

    // =========================================================================
    // Paper selection
    // =========================================================================

    /// Request the paper list.
    pub fn fetch_papers(&mut self) -> Result<(), SessionError> {
        self.transition(SessionPhase::PapersLoading)?;

        let api = Arc::clone(&self.api);
        let token = self.token.clone();
        self.spawn(async move { Completion::PapersLoaded(api.list_papers(&token).await) });
        Ok(())
    }

    /// Start an attempt at a paper from the current list and fetch its
    /// questions. Any previous answers are discarded.
    pub fn select_paper(&mut self, paper_id: &PaperId) -> Result<(), SessionError> {
        let paper = self
            .papers
            .iter()
            .find(|p| &p.id == paper_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownPaper(paper_id.clone()))?;
        self.transition(SessionPhase::QuestionsLoading)?;

        let attempt = Attempt::new(paper);
        let attempt_id = attempt.id;
        tracing::info!(paper_id = %paper_id, attempt = %attempt_id, "Paper selected");
        self.attempt = Some(attempt);

        let api = Arc::clone(&self.api);
        let token = self.token.clone();
        let id = paper_id.clone();
        self.spawn(async move {
            Completion::QuestionsLoaded {
                attempt: attempt_id,
                result: api.get_paper(&token, &id).await,
            }
        });
        Ok(())
    }

    /// Leave the current paper and go back to the picker.
    pub fn abandon_paper(&mut self) -> Result<(), SessionError> {
        if !matches!(
            self.phase,
            SessionPhase::InProgress | SessionPhase::QuestionsLoading
        ) {
            let err = SessionError::InvalidTransition {
                from: self.phase,
                to: SessionPhase::PaperPickerReady,
            };
            tracing::warn!(error = %err, "Rejected session transition");
            return Err(err);
        }
        self.transition(SessionPhase::PaperPickerReady)?;
        self.stop_dictation();
        if let Some(attempt) = self.attempt.take() {
            tracing::info!(
                paper_id = %attempt.paper.id,
                attempt = %attempt.id,
                answered = attempt.answers.len(),
                "Paper abandoned"
            );
        }
        Ok(())
    }

    // =========================================================================
    // Answering and navigation
    // =========================================================================

    /// Replace the local answer text for a question. Never touches the network.
    pub fn set_answer_text(&mut self, question_id: &QuestionId, text: impl Into<String>) {
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.set_answer(question_id, text.into());
        }
    }

    pub fn move_next(&mut self) {
        if let Some(attempt) = self.attempt.as_mut() {
            if let Some(cursor) = attempt.cursor {
                if cursor + 1 < attempt.questions.len() {
                    attempt.cursor = Some(cursor + 1);
                }
            }
        }
    }

    pub fn move_previous(&mut self) {
        if let Some(attempt) = self.attempt.as_mut() {
            if let Some(cursor) = attempt.cursor {
                attempt.cursor = Some(cursor.saturating_sub(1));
            }
        }
    }

    /// Move the cursor to `index`. Out-of-range indexes are ignored.
    pub fn jump_to(&mut self, index: usize) -> bool {
        match self.attempt.as_mut() {
            Some(attempt) if index < attempt.questions.len() => {
                attempt.cursor = Some(index);
                true
            }
            _ => false,
        }
    }

    /// Submit the answer to the current question.
    ///
    /// At most one submission is outstanding at a time. On success the cue
    /// plays and the cursor moves past the submitted question; on failure a
    /// notice is raised and everything else is left alone so the student can
    /// retry.
    pub fn submit_current(&mut self) -> SubmitStart {
        if self.phase != SessionPhase::InProgress {
            return SubmitStart::NotInProgress;
        }
        let Some(attempt) = self.attempt.as_mut() else {
            return SubmitStart::NotInProgress;
        };
        if attempt.submission == SubmissionState::Submitting {
            tracing::debug!("Submission already in flight, ignoring");
            return SubmitStart::AlreadySubmitting;
        }
        let Some((index, question)) = attempt.current() else {
            return SubmitStart::NoAnswer;
        };
        let Some(answer_text) = attempt.answers.get(&question.id).cloned() else {
            return SubmitStart::NoAnswer;
        };
        let draft = AnswerDraft {
            question_id: question.id.clone(),
            paper_id: attempt.paper.id.clone(),
            answer_text,
        };

        attempt.submission = SubmissionState::Submitting;
        let attempt_id = attempt.id;
        tracing::info!(
            question_id = %draft.question_id,
            paper_id = %draft.paper_id,
            index,
            "Submitting answer"
        );

        let api = Arc::clone(&self.api);
        let token = self.token.clone();
        self.spawn(async move {
            let result = api.submit_answer(&token, &draft).await;
            Completion::Submitted {
                attempt: attempt_id,
                index,
                question_id: draft.question_id,
                result,
            }
        });
        SubmitStart::Started
    }

    // =========================================================================
    // Voice
    // =========================================================================

    /// Begin dictating into the current question.
    ///
    /// The transcript goes to the question that was current when dictation
    /// started, even if the cursor moves in the meantime.
    pub fn start_dictation(&mut self) -> bool {
        if self.dictation_disabled || self.dictation.is_some() {
            return false;
        }
        if self.phase != SessionPhase::InProgress {
            return false;
        }
        let Some(attempt) = self.attempt.as_ref() else {
            return false;
        };
        let Some((_, question)) = attempt.current() else {
            return false;
        };
        let question_id = question.id.clone();
        let attempt_id = attempt.id;

        match self.voice.start() {
            Ok(handle) => {
                let capture = handle.id();
                tracing::info!(capture_id = %capture, question_id = %question_id, "Dictation started");

                let waiter = handle.clone();
                self.spawn(async move {
                    Completion::Dictated {
                        capture,
                        result: waiter.outcome().await,
                    }
                });
                self.dictation = Some(Dictation {
                    handle,
                    attempt: attempt_id,
                    question_id,
                });
                true
            }
            Err(e) => {
                self.on_voice_error(&e);
                false
            }
        }
    }

    /// Cancel the active capture, if any. Its transcript will be discarded.
    pub fn stop_dictation(&mut self) {
        if let Some(dictation) = self.dictation.take() {
            dictation.handle.stop();
            tracing::debug!(
                capture_id = %dictation.handle.id(),
                question_id = %dictation.question_id,
                started_at = %dictation.handle.started_at(),
                "Dictation stopped"
            );
        }
    }

    /// Speak the current question (and its options).
    pub fn read_current_aloud(&self) -> bool {
        let Some((index, question)) = self.attempt.as_ref().and_then(Attempt::current) else {
            return false;
        };
        self.speech.speak(&prompt::read_aloud_text(index, question));
        true
    }

    /// Feed a keyboard event to the session. Exam keys only act while a
    /// paper is in progress.
    pub fn handle_key(&mut self, event: KeyEvent) -> KeyOutcome {
        if self.phase != SessionPhase::InProgress {
            return KeyOutcome::Ignored;
        }
        let Some(control) = self.bindings.resolve(event) else {
            return KeyOutcome::Ignored;
        };

        match control {
            Control::StartDictation => {
                // Held keys auto-repeat; only the first press starts a capture.
                if !self.is_listening() {
                    self.start_dictation();
                }
                KeyOutcome::Handled
            }
            Control::StopDictation => {
                self.stop_dictation();
                KeyOutcome::Handled
            }
            Control::Next => {
                self.move_next();
                KeyOutcome::Handled
            }
            Control::Previous => {
                self.move_previous();
                KeyOutcome::Handled
            }
            Control::ReadAloud => {
                self.read_current_aloud();
                KeyOutcome::Consumed
            }
        }
    }

    /// Drain the notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // =========================================================================
    // Completions
    // =========================================================================

    /// Wait for the next background result.
    ///
    /// Stays pending while no work is outstanding.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.completions_rx.recv().await
    }

    /// Wait for one background result and apply it.
    pub async fn pump(&mut self) -> bool {
        match self.next_completion().await {
            Some(completion) => {
                self.apply(completion);
                true
            }
            None => false,
        }
    }

    /// Apply every result that is already available without waiting.
    pub fn pump_ready(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply(completion);
            applied += 1;
        }
        applied
    }

    pub fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::PapersLoaded(result) => self.on_papers_loaded(result),
            Completion::QuestionsLoaded { attempt, result } => {
                self.on_questions_loaded(attempt, result)
            }
            Completion::Submitted {
                attempt,
                index,
                question_id,
                result,
            } => self.on_submitted(attempt, index, question_id, result),
            Completion::Dictated { capture, result } => self.on_dictated(capture, result),
        }
    }

    fn on_papers_loaded(&mut self, result: Result<Vec<Paper>, ClientError>) {
        if self.phase != SessionPhase::PapersLoading {
            tracing::debug!(phase = %self.phase, "Ignoring paper list outside PapersLoading");
            return;
        }
        match result {
            Ok(papers) => {
                tracing::info!(count = papers.len(), "Papers loaded");
                self.papers = papers;
                self.enter(SessionPhase::PaperPickerReady);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load papers");
                self.papers.clear();
                self.raise(Notice::for_papers_error(&e));
                self.enter(SessionPhase::NoPaperSelected);
            }
        }
    }

    fn on_questions_loaded(&mut self, attempt_id: Uuid, result: Result<PaperDetail, ClientError>) {
        let is_current = self.attempt.as_ref().is_some_and(|a| a.id == attempt_id);
        if !is_current || self.phase != SessionPhase::QuestionsLoading {
            tracing::debug!(attempt = %attempt_id, "Ignoring questions for a stale attempt");
            return;
        }

        match result {
            Ok(detail) => {
                if let Some(attempt) = self.attempt.as_mut() {
                    attempt.cursor = if detail.questions.is_empty() { None } else { Some(0) };
                    attempt.paper = detail.paper;
                    attempt.questions = detail.questions;
                    tracing::info!(
                        paper_id = %attempt.paper.id,
                        questions = attempt.questions.len(),
                        "Questions loaded"
                    );
                }
                self.enter(SessionPhase::InProgress);
            }
            Err(e) => {
                let title = self
                    .attempt
                    .take()
                    .map(|a| a.paper.title)
                    .unwrap_or_default();
                tracing::warn!(error = %e, paper = %title, "Failed to load questions");
                self.raise(Notice::for_questions_error(&e, &title));
                self.enter(SessionPhase::PaperPickerReady);
            }
        }
    }

    fn on_submitted(
        &mut self,
        attempt_id: Uuid,
        index: usize,
        question_id: QuestionId,
        result: Result<SubmissionReceipt, ClientError>,
    ) {
        let Some(attempt) = self.attempt.as_mut().filter(|a| a.id == attempt_id) else {
            tracing::debug!(attempt = %attempt_id, "Ignoring submission result for a stale attempt");
            return;
        };
        attempt.submission = SubmissionState::Idle;

        match result {
            Ok(receipt) => {
                tracing::info!(
                    question_id = %receipt.question_id,
                    submitted_at = %receipt.submitted_at,
                    "Answer accepted"
                );
                self.cue.play();
                if index + 1 < attempt.questions.len() {
                    attempt.cursor = Some(index + 1);
                }
            }
            Err(e) => {
                tracing::warn!(question_id = %question_id, error = %e, "Answer submission failed");
                let notice = Notice::for_submission_error(&e, &attempt.paper.title);
                self.raise(notice);
            }
        }
    }

    fn on_dictated(&mut self, capture: Uuid, result: Result<String, VoiceError>) {
        let is_active = self
            .dictation
            .as_ref()
            .is_some_and(|d| d.handle.id() == capture);
        if !is_active {
            tracing::debug!(capture_id = %capture, "Ignoring result of an inactive capture");
            return;
        }
        let Some(dictation) = self.dictation.take() else {
            return;
        };

        match result {
            Ok(transcript) => {
                match self.attempt.as_mut().filter(|a| a.id == dictation.attempt) {
                    Some(attempt) => {
                        tracing::info!(
                            question_id = %dictation.question_id,
                            chars = transcript.len(),
                            "Transcript recorded"
                        );
                        attempt.set_answer(&dictation.question_id, transcript);
                    }
                    None => tracing::debug!("Transcript arrived after its attempt ended"),
                }
            }
            Err(e) => self.on_voice_error(&e),
        }
    }

    fn on_voice_error(&mut self, err: &VoiceError) {
        if err.is_unsupported() {
            if self.dictation_disabled {
                return;
            }
            self.dictation_disabled = true;
            tracing::warn!(error = %err, "Dictation disabled");
        } else {
            tracing::warn!(error = %err, "Voice capture failed");
        }
        if let Some(notice) = Notice::for_voice_error(err) {
            self.raise(notice);
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn papers(&self) -> &[Paper] {
        &self.papers
    }

    /// The paper being attempted. `None` means the picker is showing.
    pub fn selected_paper(&self) -> Option<&Paper> {
        self.attempt.as_ref().map(|a| &a.paper)
    }

    pub fn attempt_id(&self) -> Option<Uuid> {
        self.attempt.as_ref().map(|a| a.id)
    }

    pub fn questions(&self) -> &[Question] {
        self.attempt
            .as_ref()
            .map(|a| a.questions.as_slice())
            .unwrap_or(&[])
    }

    pub fn cursor(&self) -> Option<usize> {
        self.attempt.as_ref().and_then(|a| a.cursor)
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.attempt
            .as_ref()
            .and_then(Attempt::current)
            .map(|(_, q)| q)
    }

    pub fn answer(&self, question_id: &QuestionId) -> Option<&str> {
        self.attempt
            .as_ref()
            .and_then(|a| a.answers.get(question_id))
            .map(String::as_str)
    }

    pub fn submission_state(&self) -> SubmissionState {
        self.attempt
            .as_ref()
            .map_or(SubmissionState::Idle, |a| a.submission)
    }

    pub fn is_submitting(&self) -> bool {
        self.submission_state() == SubmissionState::Submitting
    }

    pub fn is_listening(&self) -> bool {
        self.dictation.is_some()
    }

    /// The question the active capture will write into.
    pub fn dictation_target(&self) -> Option<&QuestionId> {
        self.dictation.as_ref().map(|d| &d.question_id)
    }

    pub fn dictation_available(&self) -> bool {
        !self.dictation_disabled
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn total_questions(&self) -> usize {
        self.questions().len()
    }

    /// Questions with local answer text.
    pub fn answered_count(&self) -> usize {
        self.attempt.as_ref().map_or(0, |a| a.answers.len())
    }

    /// `answered / total` as a percentage rounded half up; 0 without questions.
    pub fn progress_percentage(&self) -> u8 {
        let total = self.total_questions();
        if total == 0 {
            return 0;
        }
        let answered = self.answered_count().min(total);
        ((200 * answered + total) / (2 * total)) as u8
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn transition(&mut self, target: SessionPhase) -> Result<(), SessionError> {
        self.phase
            .transition(target)
            .inspect_err(|e| tracing::warn!(error = %e, "Rejected session transition"))
    }

    /// Transition from a completion handler, which has already checked the phase.
    fn enter(&mut self, target: SessionPhase) {
        let _ = self.transition(target);
    }

    fn raise(&mut self, notice: Notice) {
        tracing::info!(notice = %notice, blocking = notice.is_blocking(), "Notice raised");
        self.notices.push(notice);
    }

    fn spawn<F>(&self, work: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let completion = work.await;
            if tx.send(completion).is_err() {
                tracing::debug!("Session dropped before background work finished");
            }
        });
    }
}

impl Drop for ExamSession {
    fn drop(&mut self) {
        self.stop_dictation();
    }
}

// =============================================================================
// Tests
// =============================================================================
