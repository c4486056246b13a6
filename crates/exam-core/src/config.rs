use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ExamError, Result};

/// Top-level configuration for the exam client.
///
/// Loaded from `~/.exam/config.toml` by default. Every section falls back to
/// its defaults when missing, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExamConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub cue: CueConfig,
    #[serde(default)]
    pub keys: KeysConfig,
}

impl ExamConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ExamConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is missing
    /// or invalid.
    ///
    /// The load error is handed back rather than logged so the caller can
    /// report it once logging is set up, which may itself depend on the
    /// loaded level.
    pub fn load_or_default(path: &Path) -> (Self, Option<ExamError>) {
        match Self::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Remote paper/answer store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the store; `/api/...` paths are appended.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Bearer token, if not supplied on the command line or environment.
    pub token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_secs: 15,
            token: None,
        }
    }
}

/// Dictation (speech-to-text) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Whether dictation is offered at all.
    pub enabled: bool,
    /// Recognition language tag.
    pub language: String,
    /// External recognizer: program followed by its arguments. Its trimmed
    /// stdout is taken as the transcript. Empty means no recognizer.
    pub recognizer_command: Vec<String>,
    /// Upper bound on a single capture.
    pub max_duration_secs: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            language: "en-US".to_string(),
            recognizer_command: Vec::new(),
            max_duration_secs: 30,
        }
    }
}

/// Read-aloud (text-to-speech) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    /// Program and leading arguments; the text to speak is appended.
    pub command: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: vec!["espeak".to_string()],
        }
    }
}

/// Completion cue played after an accepted submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CueConfig {
    pub enabled: bool,
}

impl Default for CueConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Key names bound to exam controls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Hold to dictate, release to stop.
    pub dictation: String,
    pub next: String,
    pub previous: String,
    pub read_aloud: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            dictation: "Control".to_string(),
            next: "ArrowRight".to_string(),
            previous: "ArrowLeft".to_string(),
            read_aloud: "Space".to_string(),
        }
    }
}
