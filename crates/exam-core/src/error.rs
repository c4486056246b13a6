use thiserror::Error;

/// Top-level error type for the exam client.
///
/// Subsystem crates define their own error types (`ClientError`,
/// `VoiceError`, `SessionError`) and convert into `ExamError` where a
/// caller needs a single error type, e.g. the application binary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Voice error: {0}")]
    Voice(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ExamError {
    fn from(err: toml::de::Error) -> Self {
        ExamError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ExamError {
    fn from(err: toml::ser::Error) -> Self {
        ExamError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ExamError {
    fn from(err: serde_json::Error) -> Self {
        ExamError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for exam operations.
pub type Result<T> = std::result::Result<T, ExamError>;
