//! CLI argument definitions for the exam client.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Exam - take exam papers from the terminal, with dictation and read-aloud.
#[derive(Parser, Debug, Default)]
#[command(name = "exam", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Base URL of the paper/answer store (e.g. http://localhost:5000).
    #[arg(short = 's', long = "server")]
    pub server: Option<String>,

    /// Bearer token identifying the student.
    #[arg(short = 't', long = "token")]
    pub token: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > EXAM_CONFIG env var > ~/.exam/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("EXAM_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the store base URL.
    ///
    /// Priority: --server flag > EXAM_SERVER env var > config file value.
    pub fn resolve_server(&self, config_url: &str) -> String {
        pick(
            self.server.as_deref(),
            std::env::var("EXAM_SERVER").ok().as_deref(),
            Some(config_url),
        )
        .unwrap_or_default()
    }

    /// Resolve the bearer token.
    ///
    /// Priority: --token flag > EXAM_TOKEN env var > config file value.
    pub fn resolve_token(&self, config_token: Option<&str>) -> Option<String> {
        pick(
            self.token.as_deref(),
            std::env::var("EXAM_TOKEN").ok().as_deref(),
            config_token,
        )
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// First non-blank value in priority order.
fn pick(flag: Option<&str>, env: Option<&str>, config: Option<&str>) -> Option<String> {
    [flag, env, config]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".exam").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".exam").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = CliArgs::parse_from([
            "exam",
            "--server",
            "http://exams.local:8080",
            "-t",
            "abc",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.server.as_deref(), Some("http://exams.local:8080"));
        assert_eq!(args.token.as_deref(), Some("abc"));
        assert_eq!(args.resolve_log_level("info"), "debug");
    }

    #[test]
    fn test_pick_priority() {
        assert_eq!(pick(Some("flag"), Some("env"), Some("file")).as_deref(), Some("flag"));
        assert_eq!(pick(None, Some("env"), Some("file")).as_deref(), Some("env"));
        assert_eq!(pick(None, None, Some("file")).as_deref(), Some("file"));
        assert_eq!(pick(None, None, None), None);
    }

    #[test]
    fn test_pick_skips_blank_values() {
        assert_eq!(pick(Some("  "), None, Some("file")).as_deref(), Some("file"));
        assert_eq!(pick(Some(""), Some(""), Some("")), None);
    }

    #[test]
    fn test_config_flag_wins() {
        let args = CliArgs {
            config: Some(PathBuf::from("/tmp/exam.toml")),
            ..CliArgs::default()
        };
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/exam.toml"));
    }

    #[test]
    fn test_log_level_falls_back_to_config() {
        assert_eq!(CliArgs::default().resolve_log_level("warn"), "warn");
    }
}
