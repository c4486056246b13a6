//! End-to-end tests for the exam session controller.
//!
//! Each test wires an `ExamSession` to in-memory fakes of the store, the
//! voice capture, speech output and the completion cue, then drives it the
//! way a front end would: call an operation, pump the completion, inspect.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use exam_client::{ClientError, ExamApi};
use exam_core::types::{
    AnswerDraft, Paper, PaperDetail, PaperId, Question, QuestionId, QuestionKind, SubmissionReceipt,
};
use exam_session::{
    Completion, ExamSession, Key, KeyBindings, KeyEvent, KeyOutcome, Notice, SessionError,
    SessionPhase, SubmitStart,
};
use exam_voice::{CaptureCompleter, CaptureHandle, CompletionCue, SpeechOutput, VoiceCapture, VoiceError};

// =============================================================================
// Fakes
// =============================================================================

const TOKEN: &str = "student-token";

/// In-memory store with the server's duplicate-answer rule.
struct FakeStore {
    token: String,
    papers: Vec<Paper>,
    details: HashMap<PaperId, PaperDetail>,
    accepted: Mutex<HashSet<(QuestionId, PaperId)>>,
    submit_calls: AtomicUsize,
    fail_next_submit: Mutex<Option<ClientError>>,
}

impl FakeStore {
    fn check(&self, token: &str) -> Result<(), ClientError> {
        if token == self.token {
            Ok(())
        } else {
            Err(ClientError::Unauthorized("Invalid token".into()))
        }
    }

    fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    fn fail_next_submit(&self, err: ClientError) {
        *self.fail_next_submit.lock().unwrap() = Some(err);
    }
}

#[async_trait]
impl ExamApi for FakeStore {
    async fn list_papers(&self, token: &str) -> Result<Vec<Paper>, ClientError> {
        self.check(token)?;
        Ok(self.papers.clone())
    }

    async fn get_paper(&self, token: &str, id: &PaperId) -> Result<PaperDetail, ClientError> {
        self.check(token)?;
        self.details
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound("Paper not found".into()))
    }

    async fn submit_answer(
        &self,
        token: &str,
        draft: &AnswerDraft,
    ) -> Result<SubmissionReceipt, ClientError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.check(token)?;
        if let Some(err) = self.fail_next_submit.lock().unwrap().take() {
            return Err(err);
        }
        let key = (draft.question_id.clone(), draft.paper_id.clone());
        if !self.accepted.lock().unwrap().insert(key) {
            return Err(ClientError::DuplicateSubmission(
                "Answer already submitted".into(),
            ));
        }
        Ok(SubmissionReceipt {
            question_id: draft.question_id.clone(),
            paper_id: draft.paper_id.clone(),
            submitted_at: Utc::now(),
        })
    }
}

/// Voice capture whose transcripts are delivered by the test.
#[derive(Default)]
struct FakeVoice {
    unsupported: bool,
    pending: Mutex<Vec<CaptureCompleter>>,
    starts: AtomicUsize,
}

impl FakeVoice {
    fn unsupported() -> Self {
        Self {
            unsupported: true,
            ..Self::default()
        }
    }

    /// Complete the oldest pending capture. Returns whether it was accepted.
    fn deliver(&self, result: Result<String, VoiceError>) -> bool {
        let completer = self.pending.lock().unwrap().remove(0);
        completer.complete(result)
    }

    fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl VoiceCapture for FakeVoice {
    fn start(&self) -> Result<CaptureHandle, VoiceError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.unsupported {
            return Err(VoiceError::Unsupported("no microphone".into()));
        }
        let (handle, completer) = CaptureHandle::new();
        self.pending.lock().unwrap().push(completer);
        Ok(handle)
    }
}

#[derive(Default)]
struct RecordingSpeech {
    spoken: Mutex<Vec<String>>,
}

impl RecordingSpeech {
    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl SpeechOutput for RecordingSpeech {
    fn speak(&self, text: &str) {
        self.spoken.lock().unwrap().push(text.to_string());
    }
}

#[derive(Default)]
struct CountingCue {
    plays: AtomicUsize,
}

impl CountingCue {
    fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

impl CompletionCue for CountingCue {
    fn play(&self) {
        self.plays.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn question(id: &str, text: &str, kind: QuestionKind, options: &[&str]) -> Question {
    Question {
        id: QuestionId::from(id),
        text: text.to_string(),
        kind,
        options: options.iter().map(|s| s.to_string()).collect(),
        answer: None,
    }
}

fn paper(id: &str, title: &str, question_ids: &[&str]) -> Paper {
    Paper {
        id: PaperId::from(id),
        title: title.to_string(),
        description: String::new(),
        question_ids: question_ids.iter().map(|q| QuestionId::from(*q)).collect(),
    }
}

/// Store with:
/// - `geo`: Q1 free text, Q2 multiple choice [Pacific, Atlantic], Q3 free text
/// - `gone`: listed but deleted from the store
/// - `blank`: no questions
fn store() -> Arc<FakeStore> {
    let geo = paper("geo", "Geography", &["q1", "q2", "q3"]);
    let gone = paper("gone", "History", &["h1"]);
    let blank = paper("blank", "Empty paper", &[]);

    let mut details = HashMap::new();
    details.insert(
        geo.id.clone(),
        PaperDetail {
            paper: geo.clone(),
            questions: vec![
                question("q1", "Capital of France?", QuestionKind::FreeText, &[]),
                question("q2", "Largest ocean?", QuestionKind::MultipleChoice, &["Pacific", "Atlantic"]),
                question("q3", "Name a desert", QuestionKind::FreeText, &[]),
            ],
        },
    );
    details.insert(
        blank.id.clone(),
        PaperDetail {
            paper: blank.clone(),
            questions: Vec::new(),
        },
    );

    Arc::new(FakeStore {
        token: TOKEN.to_string(),
        papers: vec![geo, gone, blank],
        details,
        accepted: Mutex::new(HashSet::new()),
        submit_calls: AtomicUsize::new(0),
        fail_next_submit: Mutex::new(None),
    })
}

/// Store with a single paper `sized` holding `total` free-text questions.
fn sized_store(total: usize) -> Arc<FakeStore> {
    let ids: Vec<String> = (1..=total).map(|n| format!("s{}", n)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let sized = paper("sized", "Sized", &id_refs);

    let mut details = HashMap::new();
    details.insert(
        sized.id.clone(),
        PaperDetail {
            paper: sized.clone(),
            questions: ids
                .iter()
                .map(|id| question(id, "Anything?", QuestionKind::FreeText, &[]))
                .collect(),
        },
    );

    Arc::new(FakeStore {
        token: TOKEN.to_string(),
        papers: vec![sized],
        details,
        accepted: Mutex::new(HashSet::new()),
        submit_calls: AtomicUsize::new(0),
        fail_next_submit: Mutex::new(None),
    })
}

struct Harness {
    session: ExamSession,
    store: Arc<FakeStore>,
    voice: Arc<FakeVoice>,
    speech: Arc<RecordingSpeech>,
    cue: Arc<CountingCue>,
}

fn harness_with(store: Arc<FakeStore>, voice: FakeVoice, token: &str) -> Harness {
    let voice = Arc::new(voice);
    let speech = Arc::new(RecordingSpeech::default());
    let cue = Arc::new(CountingCue::default());
    let session = ExamSession::new(
        store.clone(),
        voice.clone(),
        speech.clone(),
        cue.clone(),
        token,
    );
    Harness {
        session,
        store,
        voice,
        speech,
        cue,
    }
}

fn harness() -> Harness {
    harness_with(store(), FakeVoice::default(), TOKEN)
}

fn qid(id: &str) -> QuestionId {
    QuestionId::from(id)
}

/// Apply the next completion, failing the test if none arrives.
async fn pump(session: &mut ExamSession) {
    let applied = tokio::time::timeout(Duration::from_secs(5), session.pump())
        .await
        .expect("timed out waiting for a completion");
    assert!(applied);
}

/// Fetch the list and open `paper_id`, ending InProgress.
async fn open(h: &mut Harness, paper_id: &str) {
    h.session.fetch_papers().unwrap();
    pump(&mut h.session).await;
    h.session.select_paper(&PaperId::from(paper_id)).unwrap();
    pump(&mut h.session).await;
    assert_eq!(h.session.phase(), SessionPhase::InProgress);
}

// =============================================================================
// Paper selection
// =============================================================================

#[tokio::test]
async fn test_fetch_papers_lists_papers() {
    let mut h = harness();
    assert_eq!(h.session.phase(), SessionPhase::NoPaperSelected);

    h.session.fetch_papers().unwrap();
    assert_eq!(h.session.phase(), SessionPhase::PapersLoading);
    pump(&mut h.session).await;

    assert_eq!(h.session.phase(), SessionPhase::PaperPickerReady);
    assert_eq!(h.session.papers().len(), 3);
    assert!(h.session.selected_paper().is_none());
}

#[tokio::test]
async fn test_fetch_papers_rejected_token() {
    let mut h = harness_with(store(), FakeVoice::default(), "expired");
    h.session.fetch_papers().unwrap();
    pump(&mut h.session).await;

    assert_eq!(h.session.phase(), SessionPhase::NoPaperSelected);
    assert!(h.session.papers().is_empty());
    assert_eq!(h.session.take_notices(), vec![Notice::ReauthenticationRequired]);
    assert!(h.session.take_notices().is_empty());
}

#[tokio::test]
async fn test_refresh_from_picker() {
    let mut h = harness();
    h.session.fetch_papers().unwrap();
    pump(&mut h.session).await;

    h.session.fetch_papers().unwrap();
    pump(&mut h.session).await;
    assert_eq!(h.session.phase(), SessionPhase::PaperPickerReady);
    assert_eq!(h.session.papers().len(), 3);
}

#[tokio::test]
async fn test_select_paper_loads_questions() {
    let mut h = harness();
    h.session.fetch_papers().unwrap();
    pump(&mut h.session).await;

    h.session.select_paper(&PaperId::from("geo")).unwrap();
    assert_eq!(h.session.phase(), SessionPhase::QuestionsLoading);
    assert_eq!(h.session.selected_paper().unwrap().title, "Geography");
    assert!(h.session.current_question().is_none());

    pump(&mut h.session).await;
    assert_eq!(h.session.phase(), SessionPhase::InProgress);
    assert_eq!(h.session.total_questions(), 3);
    assert_eq!(h.session.cursor(), Some(0));
    assert_eq!(h.session.current_question().unwrap().id, qid("q1"));
    assert_eq!(h.session.answered_count(), 0);
    assert_eq!(h.session.progress_percentage(), 0);
}

#[tokio::test]
async fn test_select_unknown_paper() {
    let mut h = harness();
    h.session.fetch_papers().unwrap();
    pump(&mut h.session).await;

    let err = h.session.select_paper(&PaperId::from("nope")).unwrap_err();
    assert_eq!(err, SessionError::UnknownPaper(PaperId::from("nope")));
    assert_eq!(h.session.phase(), SessionPhase::PaperPickerReady);
}

#[tokio::test]
async fn test_select_vanished_paper() {
    let mut h = harness();
    h.session.fetch_papers().unwrap();
    pump(&mut h.session).await;

    h.session.select_paper(&PaperId::from("gone")).unwrap();
    pump(&mut h.session).await;

    assert_eq!(h.session.phase(), SessionPhase::PaperPickerReady);
    assert!(h.session.selected_paper().is_none());
    let notices = h.session.take_notices();
    assert_eq!(
        notices,
        vec![Notice::PaperUnavailable {
            title: "History".into()
        }]
    );
    assert!(notices[0].is_blocking());
}

#[tokio::test]
async fn test_paper_without_questions() {
    let mut h = harness();
    open(&mut h, "blank").await;

    assert_eq!(h.session.cursor(), None);
    assert_eq!(h.session.total_questions(), 0);
    assert_eq!(h.session.progress_percentage(), 0);

    h.session.move_next();
    h.session.move_previous();
    assert_eq!(h.session.cursor(), None);
    assert_eq!(h.session.submit_current(), SubmitStart::NoAnswer);
    assert!(!h.session.start_dictation());
    assert!(!h.session.read_current_aloud());
}

#[tokio::test]
async fn test_invalid_transitions_rejected() {
    let mut h = harness();
    // Nothing listed yet.
    assert!(matches!(
        h.session.select_paper(&PaperId::from("geo")),
        Err(SessionError::UnknownPaper(_))
    ));
    assert!(matches!(
        h.session.abandon_paper(),
        Err(SessionError::InvalidTransition { .. })
    ));

    open(&mut h, "geo").await;
    let err = h.session.fetch_papers().unwrap_err();
    assert_eq!(
        err,
        SessionError::InvalidTransition {
            from: SessionPhase::InProgress,
            to: SessionPhase::PapersLoading,
        }
    );
    assert_eq!(h.session.phase(), SessionPhase::InProgress);
}

#[tokio::test]
async fn test_abandon_returns_to_picker() {
    let mut h = harness();
    open(&mut h, "geo").await;
    h.session.set_answer_text(&qid("q1"), "Paris");

    h.session.abandon_paper().unwrap();
    assert_eq!(h.session.phase(), SessionPhase::PaperPickerReady);
    assert!(h.session.selected_paper().is_none());
    assert_eq!(h.session.answered_count(), 0);

    // Reopening starts a fresh attempt.
    h.session.select_paper(&PaperId::from("geo")).unwrap();
    pump(&mut h.session).await;
    assert_eq!(h.session.answer(&qid("q1")), None);
    assert_eq!(h.session.cursor(), Some(0));
}

#[tokio::test]
async fn test_abandon_while_loading_drops_questions() {
    let mut h = harness();
    h.session.fetch_papers().unwrap();
    pump(&mut h.session).await;
    h.session.select_paper(&PaperId::from("geo")).unwrap();

    h.session.abandon_paper().unwrap();
    pump(&mut h.session).await;

    assert_eq!(h.session.phase(), SessionPhase::PaperPickerReady);
    assert!(h.session.questions().is_empty());
}

// =============================================================================
// Answers and navigation
// =============================================================================

#[tokio::test]
async fn test_cursor_stays_in_range() {
    let mut h = harness();
    open(&mut h, "geo").await;

    h.session.move_previous();
    assert_eq!(h.session.cursor(), Some(0));
    for _ in 0..5 {
        h.session.move_next();
    }
    assert_eq!(h.session.cursor(), Some(2));
    for _ in 0..5 {
        h.session.move_previous();
    }
    assert_eq!(h.session.cursor(), Some(0));
}

#[tokio::test]
async fn test_cursor_stays_in_range_for_all_move_sequences() {
    const MAX_LEN: u32 = 6;

    let mut h = harness();
    open(&mut h, "geo").await;
    let total = h.session.total_questions();

    for len in 1..=MAX_LEN {
        // Each bit of `pattern` picks next (1) or previous (0).
        for pattern in 0..(1u32 << len) {
            h.session.jump_to(0);
            let mut expected = 0usize;
            for step in 0..len {
                if pattern & (1 << step) != 0 {
                    h.session.move_next();
                    expected = (expected + 1).min(total - 1);
                } else {
                    h.session.move_previous();
                    expected = expected.saturating_sub(1);
                }
                let cursor = h.session.cursor().unwrap();
                assert!(cursor < total, "pattern {:b} left the paper", pattern);
                assert_eq!(cursor, expected, "pattern {:b} step {}", pattern, step);
            }
        }
    }
}

#[tokio::test]
async fn test_jump_to() {
    let mut h = harness();
    open(&mut h, "geo").await;

    assert!(h.session.jump_to(2));
    assert_eq!(h.session.current_question().unwrap().id, qid("q3"));
    assert!(!h.session.jump_to(3));
    assert_eq!(h.session.cursor(), Some(2));
}

#[tokio::test]
async fn test_set_answer_text() {
    let mut h = harness();
    open(&mut h, "geo").await;

    h.session.set_answer_text(&qid("q2"), "A");
    h.session.set_answer_text(&qid("not-on-paper"), "x");
    assert_eq!(h.session.answer(&qid("q2")), Some("A"));
    assert_eq!(h.session.answered_count(), 1);

    h.session.set_answer_text(&qid("q2"), "");
    assert_eq!(h.session.answer(&qid("q2")), None);
    assert_eq!(h.session.answered_count(), 0);
    assert_eq!(h.store.submit_calls(), 0);
}

#[tokio::test]
async fn test_progress_rounds_half_up() {
    let mut h = harness();
    open(&mut h, "geo").await;

    h.session.set_answer_text(&qid("q1"), "Paris");
    assert_eq!(h.session.progress_percentage(), 33);
    h.session.set_answer_text(&qid("q2"), "A");
    assert_eq!(h.session.progress_percentage(), 67);
    h.session.set_answer_text(&qid("q3"), "Sahara");
    assert_eq!(h.session.progress_percentage(), 100);
}

#[tokio::test]
async fn test_whitespace_answer_counts_and_submits() {
    let mut h = harness();
    open(&mut h, "geo").await;

    h.session.set_answer_text(&qid("q1"), "   ");
    assert_eq!(h.session.answer(&qid("q1")), Some("   "));
    assert_eq!(h.session.answered_count(), 1);
    assert_eq!(h.session.progress_percentage(), 33);

    assert_eq!(h.session.submit_current(), SubmitStart::Started);
    pump(&mut h.session).await;
    assert_eq!(h.store.submit_calls(), 1);
}

#[tokio::test]
async fn test_cleared_answer_is_not_submitted() {
    let mut h = harness();
    open(&mut h, "geo").await;

    h.session.set_answer_text(&qid("q1"), "Paris");
    h.session.set_answer_text(&qid("q1"), "");
    assert_eq!(h.session.submit_current(), SubmitStart::NoAnswer);
    assert_eq!(h.store.submit_calls(), 0);
}

#[tokio::test]
async fn test_progress_for_every_answered_total_pair() {
    for total in 1..=8usize {
        let mut h = harness_with(sized_store(total), FakeVoice::default(), TOKEN);
        open(&mut h, "sized").await;
        assert_eq!(h.session.progress_percentage(), 0);

        let ids: Vec<QuestionId> = h.session.questions().iter().map(|q| q.id.clone()).collect();
        for (i, id) in ids.iter().enumerate() {
            h.session.set_answer_text(id, "x");
            let answered = i + 1;
            let expected = (100.0 * answered as f64 / total as f64).round() as u8;
            assert_eq!(
                h.session.progress_percentage(),
                expected,
                "{} of {} answered",
                answered,
                total
            );
            if (answered, total) == (1, 8) {
                assert_eq!(h.session.progress_percentage(), 13);
            }
        }
    }
}

// =============================================================================
// Submission
// =============================================================================

#[tokio::test]
async fn test_submit_then_duplicate_in_fresh_session() {
    let shared = store();

    let mut first = harness_with(shared.clone(), FakeVoice::default(), TOKEN);
    open(&mut first, "geo").await;
    first.session.set_answer_text(&qid("q1"), "Paris");
    assert_eq!(first.session.submit_current(), SubmitStart::Started);
    assert!(first.session.is_submitting());
    pump(&mut first.session).await;

    assert!(!first.session.is_submitting());
    assert_eq!(first.session.cursor(), Some(1));
    assert_eq!(first.session.answered_count(), 1);
    assert_eq!(first.session.progress_percentage(), 33);
    assert_eq!(first.cue.plays(), 1);
    assert!(first.session.take_notices().is_empty());

    let mut second = harness_with(shared.clone(), FakeVoice::default(), TOKEN);
    open(&mut second, "geo").await;
    second.session.set_answer_text(&qid("q1"), "Paris");
    assert_eq!(second.session.submit_current(), SubmitStart::Started);
    pump(&mut second.session).await;

    assert_eq!(second.session.cursor(), Some(0));
    assert_eq!(second.session.answered_count(), 1);
    assert!(!second.session.is_submitting());
    assert_eq!(second.session.take_notices(), vec![Notice::AlreadyAnswered]);
    assert_eq!(second.cue.plays(), 0);
    assert_eq!(shared.submit_calls(), 2);
}

#[tokio::test]
async fn test_rapid_double_submit_sends_once() {
    let mut h = harness();
    open(&mut h, "geo").await;
    h.session.set_answer_text(&qid("q1"), "Paris");

    assert_eq!(h.session.submit_current(), SubmitStart::Started);
    assert_eq!(h.session.submit_current(), SubmitStart::AlreadySubmitting);
    pump(&mut h.session).await;

    tokio::task::yield_now().await;
    assert_eq!(h.session.pump_ready(), 0);
    assert_eq!(h.store.submit_calls(), 1);
    assert!(h.session.take_notices().is_empty());
}

#[tokio::test]
async fn test_submit_last_question_keeps_cursor() {
    let mut h = harness();
    open(&mut h, "geo").await;
    h.session.jump_to(2);
    h.session.set_answer_text(&qid("q3"), "Sahara");

    h.session.submit_current();
    pump(&mut h.session).await;

    assert_eq!(h.session.cursor(), Some(2));
    assert_eq!(h.cue.plays(), 1);
}

#[tokio::test]
async fn test_submit_without_answer_is_ignored() {
    let mut h = harness();
    open(&mut h, "geo").await;

    assert_eq!(h.session.submit_current(), SubmitStart::NoAnswer);
    assert!(!h.session.is_submitting());
    tokio::task::yield_now().await;
    assert_eq!(h.session.pump_ready(), 0);
    assert_eq!(h.store.submit_calls(), 0);
}

#[tokio::test]
async fn test_submit_outside_progress() {
    let mut h = harness();
    assert_eq!(h.session.submit_current(), SubmitStart::NotInProgress);
}

#[tokio::test]
async fn test_transient_failure_allows_retry() {
    let mut h = harness();
    open(&mut h, "geo").await;
    h.session.set_answer_text(&qid("q1"), "Paris");
    h.store.fail_next_submit(ClientError::Transient("connection reset".into()));

    h.session.submit_current();
    pump(&mut h.session).await;
    assert!(!h.session.is_submitting());
    assert_eq!(h.session.cursor(), Some(0));
    assert_eq!(h.session.answer(&qid("q1")), Some("Paris"));
    let notices = h.session.take_notices();
    assert!(matches!(notices.as_slice(), [Notice::SubmissionFailed(_)]));

    assert_eq!(h.session.submit_current(), SubmitStart::Started);
    pump(&mut h.session).await;
    assert_eq!(h.session.cursor(), Some(1));
    assert_eq!(h.store.submit_calls(), 2);
}

#[tokio::test]
async fn test_submit_rejected_token_asks_to_sign_in() {
    let mut h = harness();
    open(&mut h, "geo").await;
    h.session.set_answer_text(&qid("q1"), "Paris");
    h.store.fail_next_submit(ClientError::Unauthorized("Invalid token".into()));

    h.session.submit_current();
    pump(&mut h.session).await;
    assert_eq!(h.session.take_notices(), vec![Notice::ReauthenticationRequired]);
    assert!(!h.session.is_submitting());
}

#[tokio::test]
async fn test_submission_for_abandoned_attempt_is_ignored() {
    let mut h = harness();
    open(&mut h, "geo").await;
    h.session.set_answer_text(&qid("q1"), "Paris");
    h.session.submit_current();
    h.session.abandon_paper().unwrap();

    pump(&mut h.session).await;
    assert_eq!(h.session.phase(), SessionPhase::PaperPickerReady);
    assert_eq!(h.cue.plays(), 0);
    assert!(!h.session.is_submitting());
    assert!(h.session.take_notices().is_empty());
}

// =============================================================================
// Dictation
// =============================================================================

#[tokio::test]
async fn test_transcript_binds_to_start_question() {
    let mut h = harness();
    open(&mut h, "geo").await;
    h.session.jump_to(1);

    assert_eq!(h.session.handle_key(KeyEvent::Down(Key::Control)), KeyOutcome::Handled);
    assert!(h.session.is_listening());
    assert_eq!(h.session.dictation_target(), Some(&qid("q2")));

    h.session.handle_key(KeyEvent::Down(Key::ArrowRight));
    assert_eq!(h.session.cursor(), Some(2));

    assert!(h.voice.deliver(Ok("A".into())));
    pump(&mut h.session).await;

    assert!(!h.session.is_listening());
    assert_eq!(h.session.answer(&qid("q2")), Some("A"));
    assert_eq!(h.session.answer(&qid("q3")), None);
}

#[tokio::test]
async fn test_transcript_after_stop_is_discarded() {
    let mut h = harness();
    open(&mut h, "geo").await;

    assert!(h.session.start_dictation());
    h.session.stop_dictation();
    assert!(!h.session.is_listening());

    assert!(!h.voice.deliver(Ok("too late".into())));
    pump(&mut h.session).await;

    assert_eq!(h.session.answer(&qid("q1")), None);
    assert!(h.session.take_notices().is_empty());
}

#[tokio::test]
async fn test_result_of_superseded_capture_is_ignored() {
    let mut h = harness();
    open(&mut h, "geo").await;
    assert!(h.session.start_dictation());

    h.session.apply(Completion::Dictated {
        capture: Uuid::new_v4(),
        result: Ok("someone else".into()),
    });
    assert!(h.session.is_listening());
    assert_eq!(h.session.answer(&qid("q1")), None);
}

#[tokio::test]
async fn test_dictation_key_repeat_starts_once() {
    let mut h = harness();
    open(&mut h, "geo").await;

    h.session.handle_key(KeyEvent::Down(Key::Control));
    h.session.handle_key(KeyEvent::Down(Key::Control));
    h.session.handle_key(KeyEvent::Down(Key::Control));
    assert_eq!(h.voice.starts(), 1);

    assert_eq!(h.session.handle_key(KeyEvent::Up(Key::Control)), KeyOutcome::Handled);
    assert!(!h.session.is_listening());
    pump(&mut h.session).await;
}

#[tokio::test]
async fn test_recognition_failure_raises_notice() {
    let mut h = harness();
    open(&mut h, "geo").await;
    h.session.start_dictation();

    h.voice.deliver(Err(VoiceError::Recognition("no speech recognised".into())));
    pump(&mut h.session).await;

    assert!(!h.session.is_listening());
    assert!(h.session.dictation_available());
    assert!(matches!(
        h.session.take_notices().as_slice(),
        [Notice::VoiceRecognitionFailed(_)]
    ));
    // A new capture can start straight away.
    assert!(h.session.start_dictation());
}

#[tokio::test]
async fn test_unsupported_dictation_disables_once() {
    let mut h = harness_with(store(), FakeVoice::unsupported(), TOKEN);
    open(&mut h, "geo").await;

    assert_eq!(h.session.handle_key(KeyEvent::Down(Key::Control)), KeyOutcome::Handled);
    assert!(!h.session.is_listening());
    assert!(!h.session.dictation_available());
    assert!(matches!(
        h.session.take_notices().as_slice(),
        [Notice::DictationUnavailable(_)]
    ));

    assert!(!h.session.start_dictation());
    assert_eq!(h.voice.starts(), 1);
    assert!(h.session.take_notices().is_empty());
}

#[tokio::test]
async fn test_abandon_stops_dictation() {
    let mut h = harness();
    open(&mut h, "geo").await;
    h.session.start_dictation();

    h.session.abandon_paper().unwrap();
    assert!(!h.session.is_listening());
    assert!(!h.voice.deliver(Ok("Paris".into())));
    pump(&mut h.session).await;
    assert!(h.session.take_notices().is_empty());
}

// =============================================================================
// Keys and read-aloud
// =============================================================================

#[tokio::test]
async fn test_keys_ignored_outside_progress() {
    let mut h = harness();
    assert_eq!(h.session.handle_key(KeyEvent::Down(Key::Space)), KeyOutcome::Ignored);

    h.session.fetch_papers().unwrap();
    pump(&mut h.session).await;
    assert_eq!(h.session.handle_key(KeyEvent::Down(Key::ArrowRight)), KeyOutcome::Ignored);
    assert_eq!(h.session.handle_key(KeyEvent::Down(Key::Control)), KeyOutcome::Ignored);
    assert_eq!(h.voice.starts(), 0);
}

#[tokio::test]
async fn test_arrow_keys_navigate() {
    let mut h = harness();
    open(&mut h, "geo").await;

    assert_eq!(h.session.handle_key(KeyEvent::Down(Key::ArrowRight)), KeyOutcome::Handled);
    assert_eq!(h.session.cursor(), Some(1));
    assert_eq!(h.session.handle_key(KeyEvent::Down(Key::ArrowLeft)), KeyOutcome::Handled);
    assert_eq!(h.session.cursor(), Some(0));
    assert_eq!(h.session.handle_key(KeyEvent::Up(Key::ArrowRight)), KeyOutcome::Ignored);
    assert_eq!(h.session.handle_key(KeyEvent::Down(Key::Char('x'))), KeyOutcome::Ignored);
    assert_eq!(h.session.cursor(), Some(0));
}

#[tokio::test]
async fn test_space_reads_question_aloud() {
    let mut h = harness();
    open(&mut h, "geo").await;

    assert_eq!(h.session.handle_key(KeyEvent::Down(Key::Space)), KeyOutcome::Consumed);
    h.session.move_next();
    assert!(h.session.read_current_aloud());

    assert_eq!(
        h.speech.spoken(),
        vec![
            "Question 1: Capital of France?".to_string(),
            "Question 2: Largest ocean?. Options are: A. Pacific, B. Atlantic".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_custom_bindings() {
    let store = store();
    let voice = Arc::new(FakeVoice::default());
    let speech = Arc::new(RecordingSpeech::default());
    let cue = Arc::new(CountingCue::default());
    let bindings = KeyBindings {
        next: Key::Char('n'),
        previous: Key::Char('p'),
        ..KeyBindings::default()
    };
    let session = ExamSession::new(store.clone(), voice.clone(), speech.clone(), cue.clone(), TOKEN)
        .with_bindings(bindings);
    let mut h = Harness {
        session,
        store,
        voice,
        speech,
        cue,
    };
    open(&mut h, "geo").await;

    assert_eq!(h.session.handle_key(KeyEvent::Down(Key::ArrowRight)), KeyOutcome::Ignored);
    assert_eq!(h.session.handle_key(KeyEvent::Down(Key::Char('n'))), KeyOutcome::Handled);
    assert_eq!(h.session.cursor(), Some(1));
    h.session.handle_key(KeyEvent::Down(Key::Char('p')));
    assert_eq!(h.session.cursor(), Some(0));
}
