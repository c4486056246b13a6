//! Speech-to-text backends used by [`RecognizerCapture`](crate::capture::RecognizerCapture).

use std::future::Future;
use std::process::Stdio;

use tokio::process::Command;

use crate::error::VoiceError;

/// Single-shot speech recognition: listen for one utterance and return its
/// transcript.
///
/// Dropping the returned future must abandon the recognition; captures are
/// cancelled that way.
pub trait Recognizer: Send + Sync + 'static {
    fn recognize(&self, language: &str) -> impl Future<Output = Result<String, VoiceError>> + Send;
}

/// Recognizer delegating to an external program.
///
/// The program is expected to listen for one utterance and print the
/// transcript on stdout. Any `{language}` argument is replaced with the
/// capture language. The child is killed if the capture is cancelled.
#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
}

impl CommandRecognizer {
    /// Build from an argv list (`["program", "arg", ...]`).
    ///
    /// An empty list means no recognizer is configured.
    pub fn new(argv: &[String]) -> Result<Self, VoiceError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| VoiceError::Unsupported("no recognizer command configured".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn args_for(&self, language: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace("{language}", language))
            .collect()
    }
}

impl Recognizer for CommandRecognizer {
    async fn recognize(&self, language: &str) -> Result<String, VoiceError> {
        let output = Command::new(&self.program)
            .args(self.args_for(language))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    VoiceError::Unsupported(format!("recognizer '{}' not found", self.program))
                } else {
                    VoiceError::Recognition(format!("failed to run '{}': {}", self.program, e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VoiceError::Recognition(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let transcript = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if transcript.is_empty() {
            return Err(VoiceError::Recognition("no speech recognised".to_string()));
        }
        Ok(transcript)
    }
}
