//! Read-aloud output.
//!
//! `speak` never blocks the caller and reports nothing back; a new utterance
//! interrupts the previous one.

use std::process::Stdio;
use std::sync::{Mutex, PoisonError};

use tokio::process::{Child, Command};

/// A text-to-speech facility.
pub trait SpeechOutput: Send + Sync {
    /// Request vocalization of `text`. Fire-and-forget.
    fn speak(&self, text: &str);
}

/// Speaks by spawning an external program (e.g. `espeak`) with the text as
/// its final argument.
#[derive(Debug)]
pub struct CommandSpeech {
    program: String,
    args: Vec<String>,
    current: Mutex<Option<Child>>,
}

impl CommandSpeech {
    /// Build from an argv list. Returns `None` when the list is empty.
    pub fn new(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            current: Mutex::new(None),
        })
    }
}

impl SpeechOutput for CommandSpeech {
    fn speak(&self, text: &str) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(previous) = current.as_mut() {
            // Interrupt the utterance still playing, if any.
            if let Err(e) = previous.start_kill() {
                tracing::debug!(error = %e, "Previous utterance already finished");
            }
        }

        match Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => {
                tracing::debug!(program = %self.program, text_len = text.len(), "Speaking");
                *current = Some(child);
            }
            Err(e) => {
                tracing::warn!(program = %self.program, error = %e, "Failed to start speech output");
                *current = None;
            }
        }
    }
}

/// Speech output that only logs what would have been said.
#[derive(Debug, Clone, Default)]
pub struct SilentSpeech;

impl SpeechOutput for SilentSpeech {
    fn speak(&self, text: &str) {
        tracing::info!(text = %text, "Read aloud (speech output disabled)");
    }
}
