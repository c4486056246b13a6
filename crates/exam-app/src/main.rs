//! Exam client binary - composition root.
//!
//! 1. Parse CLI args and load configuration
//! 2. Build the store client, voice capture, speech output and completion cue
//! 3. Run the session loop over stdin commands and background completions

mod cli;
mod console;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use exam_client::{ExamApi, HttpExamApi};
use exam_core::config::{CueConfig, ExamConfig, SpeechConfig, VoiceConfig};
use exam_session::{ExamSession, KeyBindings, SessionError, SubmitStart};
use exam_voice::{
    BellCue, CommandRecognizer, CommandSpeech, CompletionCue, RecognizerCapture, SilentCue,
    SilentSpeech, SpeechOutput, UnsupportedCapture, VoiceCapture, VoiceError,
};

use cli::CliArgs;
use console::ConsoleCommand;

fn build_voice(config: &VoiceConfig) -> Arc<dyn VoiceCapture> {
    if !config.enabled {
        tracing::info!("Dictation disabled in config");
        return Arc::new(UnsupportedCapture::new("dictation is disabled in the configuration"));
    }
    match CommandRecognizer::new(&config.recognizer_command) {
        Ok(recognizer) => {
            tracing::info!(
                command = ?config.recognizer_command,
                language = %config.language,
                "Dictation enabled"
            );
            Arc::new(RecognizerCapture::new(
                recognizer,
                config.language.clone(),
                Duration::from_secs(config.max_duration_secs),
            ))
        }
        Err(e) => {
            tracing::info!(error = %e, "Dictation unavailable");
            let reason = match e {
                VoiceError::Unsupported(reason) => reason,
                other => other.to_string(),
            };
            Arc::new(UnsupportedCapture::new(reason))
        }
    }
}

fn build_speech(config: &SpeechConfig) -> Arc<dyn SpeechOutput> {
    if config.enabled {
        if let Some(speech) = CommandSpeech::new(&config.command) {
            tracing::info!(command = ?config.command, "Read-aloud enabled");
            return Arc::new(speech);
        }
    }
    tracing::info!("Read-aloud disabled, questions will be logged instead");
    Arc::new(SilentSpeech)
}

fn build_cue(config: &CueConfig) -> Arc<dyn CompletionCue> {
    if config.enabled {
        Arc::new(BellCue)
    } else {
        Arc::new(SilentCue)
    }
}

/// Print pending notices followed by the current view.
fn show(session: &mut ExamSession) {
    for notice in session.take_notices() {
        println!("{}", console::render_notice(&notice));
    }
    println!("{}\n", console::render(session));
}

fn report(result: Result<(), SessionError>) {
    if let Err(e) = result {
        println!("{}", e);
    }
}

fn set_current_answer(session: &mut ExamSession, text: String) {
    match session.current_question().map(|q| q.id.clone()) {
        Some(id) => session.set_answer_text(&id, text),
        None => println!("Open a paper first."),
    }
}

/// Run one console command. Returns `false` when the user asked to quit.
fn handle_line(session: &mut ExamSession, line: &str) -> bool {
    let command = match line.parse::<ConsoleCommand>() {
        Ok(command) => command,
        Err(msg) => {
            println!("{}", msg);
            return true;
        }
    };

    match command {
        ConsoleCommand::Papers => report(session.fetch_papers()),
        ConsoleCommand::Open(arg) => match console::resolve_paper(session, &arg) {
            Some(id) => report(session.select_paper(&id)),
            None => println!("No paper '{}' in the list.", arg),
        },
        ConsoleCommand::Answer(text) => set_current_answer(session, text),
        ConsoleCommand::Clear => set_current_answer(session, String::new()),
        ConsoleCommand::Next => session.move_next(),
        ConsoleCommand::Previous => session.move_previous(),
        ConsoleCommand::Goto(n) => {
            if !session.jump_to(n.saturating_sub(1)) {
                println!("There is no question {}.", n);
            }
        }
        ConsoleCommand::Submit => match session.submit_current() {
            SubmitStart::Started => {}
            SubmitStart::AlreadySubmitting => println!("Still submitting the previous answer."),
            SubmitStart::NoAnswer => println!("Type an answer before submitting."),
            SubmitStart::NotInProgress => println!("Open a paper first."),
        },
        ConsoleCommand::Read => {
            if !session.read_current_aloud() {
                println!("Nothing to read.");
            }
        }
        ConsoleCommand::Dictate => {
            if !session.start_dictation() && session.dictation_available() && !session.is_listening() {
                println!("Dictation needs an open question.");
            }
        }
        ConsoleCommand::Stop => session.stop_dictation(),
        ConsoleCommand::Key(event) => {
            let outcome = session.handle_key(event);
            tracing::debug!(?event, ?outcome, "Key event");
        }
        ConsoleCommand::Status => {}
        ConsoleCommand::Finish => report(session.abandon_paper()),
        ConsoleCommand::Help => {
            println!("{}", console::HELP);
            return true;
        }
        ConsoleCommand::Quit => return false,
    }

    show(session);
    true
}

async fn run(session: &mut ExamSession) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !handle_line(session, &line) {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read from stdin");
                    break;
                }
            },
            Some(completion) = session.next_completion() => {
                session.apply(completion);
                show(session);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.stop_dictation();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config comes first so its log level can seed the filter.
    let config_file = args.resolve_config_path();
    let (mut config, load_error) = ExamConfig::load_or_default(&config_file);
    let log_level = args.resolve_log_level(&config.general.log_level);

    // Tracing. Logs go to stderr so they don't interleave with the exam view.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting exam client v{}", env!("CARGO_PKG_VERSION"));

    if let Some(e) = load_error {
        tracing::warn!(path = %config_file.display(), error = %e, "Using default configuration");
    }
    config.server.base_url = args.resolve_server(&config.server.base_url);

    let token = args
        .resolve_token(config.server.token.as_deref())
        .ok_or("no bearer token: pass --token, set EXAM_TOKEN or add `token` under [server]")?;
    let bindings = KeyBindings::from_config(&config.keys)?;

    let api: Arc<dyn ExamApi> = Arc::new(HttpExamApi::from_config(&config.server)?);
    tracing::info!(server = %config.server.base_url, "Store client ready");

    let mut session = ExamSession::new(
        api,
        build_voice(&config.voice),
        build_speech(&config.speech),
        build_cue(&config.cue),
        token,
    )
    .with_bindings(bindings);

    println!("{}\n", console::HELP);
    session.fetch_papers()?;
    show(&mut session);

    run(&mut session).await;

    tracing::info!("Exam client stopped");
    Ok(())
}
