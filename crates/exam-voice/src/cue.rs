//! Audible cue played after an accepted submission.

use std::io::Write;

/// A short completion sound. Fire-and-forget.
pub trait CompletionCue: Send + Sync {
    fn play(&self);
}

/// Rings the terminal bell.
#[derive(Debug, Clone, Default)]
pub struct BellCue;

impl CompletionCue for BellCue {
    fn play(&self) {
        let mut stdout = std::io::stdout();
        if let Err(e) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
            tracing::debug!(error = %e, "Failed to ring terminal bell");
        }
    }
}

/// No sound at all.
#[derive(Debug, Clone, Default)]
pub struct SilentCue;

impl CompletionCue for SilentCue {
    fn play(&self) {}
}
