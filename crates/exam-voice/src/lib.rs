//! Exam voice crate - dictation capture, read-aloud output and the completion cue.
//!
//! Capture is modelled as a single-shot asynchronous operation: `start`
//! returns a [`CaptureHandle`] that resolves to exactly one transcript or one
//! error, and can be stopped at any time. A stopped capture never yields a
//! transcript.

pub mod capture;
pub mod cue;
pub mod error;
pub mod recognizer;
pub mod speech;
pub mod state;

pub use capture::{CaptureCompleter, CaptureHandle, RecognizerCapture, UnsupportedCapture, VoiceCapture};
pub use cue::{BellCue, CompletionCue, SilentCue};
pub use error::VoiceError;
pub use recognizer::{CommandRecognizer, Recognizer};
pub use speech::{CommandSpeech, SilentSpeech, SpeechOutput};
pub use state::CaptureState;
