//! Line-oriented terminal front end.
//!
//! Each input line is one command. Key events can be injected with
//! `key down <name>` / `key up <name>` so the bindings behave the same as in
//! a windowed front end.

use std::str::FromStr;

use exam_core::types::PaperId;
use exam_session::{ExamSession, Key, KeyEvent, Notice, SessionPhase};

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Papers,
    /// Open a paper by its 1-based position in the list, or by id.
    Open(String),
    Answer(String),
    Clear,
    Next,
    Previous,
    /// 1-based question number.
    Goto(usize),
    Submit,
    Read,
    Dictate,
    Stop,
    Key(KeyEvent),
    Status,
    Finish,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "papers" | "refresh" => Ok(ConsoleCommand::Papers),
            "open" if !rest.is_empty() => Ok(ConsoleCommand::Open(rest.to_string())),
            "open" => Err("usage: open <number|id>".to_string()),
            "answer" | "a" => Ok(ConsoleCommand::Answer(rest.to_string())),
            "clear" => Ok(ConsoleCommand::Clear),
            "next" | "n" => Ok(ConsoleCommand::Next),
            "prev" | "previous" | "p" => Ok(ConsoleCommand::Previous),
            "goto" | "g" => rest
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .map(ConsoleCommand::Goto)
                .ok_or_else(|| "usage: goto <question number>".to_string()),
            "submit" => Ok(ConsoleCommand::Submit),
            "read" | "r" => Ok(ConsoleCommand::Read),
            "dictate" | "d" => Ok(ConsoleCommand::Dictate),
            "stop" => Ok(ConsoleCommand::Stop),
            "key" => parse_key_event(rest).map(ConsoleCommand::Key),
            "status" | "s" | "" => Ok(ConsoleCommand::Status),
            "finish" => Ok(ConsoleCommand::Finish),
            "help" | "?" => Ok(ConsoleCommand::Help),
            "quit" | "exit" | "q" => Ok(ConsoleCommand::Quit),
            other => Err(format!("unknown command '{}' (try 'help')", other)),
        }
    }
}

fn parse_key_event(rest: &str) -> Result<KeyEvent, String> {
    let usage = || "usage: key <down|up> <key name>".to_string();
    let (direction, name) = rest.split_once(char::is_whitespace).ok_or_else(usage)?;
    let key: Key = name.trim().parse().map_err(|e| format!("{}", e))?;
    match direction.to_ascii_lowercase().as_str() {
        "down" => Ok(KeyEvent::Down(key)),
        "up" => Ok(KeyEvent::Up(key)),
        _ => Err(usage()),
    }
}

/// Resolve the argument of `open` against the listed papers.
pub fn resolve_paper(session: &ExamSession, arg: &str) -> Option<PaperId> {
    if let Ok(position) = arg.parse::<usize>() {
        if let Some(paper) = position.checked_sub(1).and_then(|i| session.papers().get(i)) {
            return Some(paper.id.clone());
        }
    }
    session
        .papers()
        .iter()
        .find(|p| p.id.0 == arg)
        .map(|p| p.id.clone())
}

pub const HELP: &str = "\
Commands:
  papers              list (or refresh) the available papers
  open <n|id>         start a paper
  answer <text>       set the answer to the current question
  clear               clear the current answer
  next | prev         move between questions
  goto <n>            jump to question n
  submit              submit the current answer
  read                read the current question aloud
  dictate | stop      start or stop dictating into the current question
  key <down|up> <k>   send a key event (e.g. key down Control)
  status              show where you are
  finish              leave the paper and return to the list
  quit                exit";

/// Render the session for the terminal.
pub fn render(session: &ExamSession) -> String {
    match session.phase() {
        SessionPhase::NoPaperSelected => "No papers loaded. Type 'papers' to list them.".to_string(),
        SessionPhase::PapersLoading => "Loading papers...".to_string(),
        SessionPhase::PaperPickerReady => render_picker(session),
        SessionPhase::QuestionsLoading => match session.selected_paper() {
            Some(paper) => format!("Loading questions for \"{}\"...", paper.title),
            None => "Loading questions...".to_string(),
        },
        SessionPhase::InProgress => render_question(session),
    }
}

fn render_picker(session: &ExamSession) -> String {
    if session.papers().is_empty() {
        return "No papers available.".to_string();
    }
    let mut out = String::from("Available papers:");
    for (i, paper) in session.papers().iter().enumerate() {
        out.push_str(&format!(
            "\n  {}. {} ({} questions)",
            i + 1,
            paper.title,
            paper.question_count()
        ));
        if !paper.description.is_empty() {
            out.push_str(&format!("\n     {}", paper.description));
        }
    }
    out
}

fn render_question(session: &ExamSession) -> String {
    let title = session
        .selected_paper()
        .map(|p| p.title.as_str())
        .unwrap_or_default();
    let total = session.total_questions();

    let (Some(index), Some(question)) = (session.cursor(), session.current_question()) else {
        return format!("{}\nThis paper has no questions. Type 'finish' to go back.", title);
    };

    let mut out = format!(
        "{} - question {} of {} | answered {} ({}%)",
        title,
        index + 1,
        total,
        session.answered_count(),
        session.progress_percentage()
    );
    out.push_str(&format!("\n\n{}", question.text));
    for (letter, option) in question.lettered_options() {
        out.push_str(&format!("\n  {}. {}", letter, option));
    }
    match session.answer(&question.id) {
        Some(answer) => out.push_str(&format!("\n\nYour answer: {}", answer)),
        None => out.push_str("\n\nYour answer: (none)"),
    }
    if session.is_submitting() {
        out.push_str("\nSubmitting...");
    }
    if session.is_listening() {
        out.push_str("\nListening... ('stop' to finish)");
    }
    out
}

pub fn render_notice(notice: &Notice) -> String {
    if notice.is_blocking() {
        format!("!! {}", notice)
    } else {
        format!("! {}", notice)
    }
}
