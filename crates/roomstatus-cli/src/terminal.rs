//! Terminal foreground: decision dialogs, confirm prompts and the console
//! command line, all fed from one stdin line stream.

use std::sync::Mutex;

use async_trait::async_trait;
use owo_colors::OwoColorize;
use roomstatus_core::{DialogHost, Prompt};
use roomstatus_types::relay::{CALL_BODY, YO_BODY};
use roomstatus_types::{Decision, HistoryEntry, SignalKind};
use time::UtcOffset;
use time::macros::format_description;
use tokio::sync::oneshot;
use tracing::debug;

/// Commands typed at the monitor prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Connect,
    Disconnect,
    Status(String),
    Read,
    History,
    Gain(Option<f32>),
    Help,
    Quit,
}

/// What a line of input turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Answered a pending confirm prompt.
    Answered,
    /// Picked a decision in an open dialog.
    Decide(Decision),
    Command(ConsoleCommand),
    Empty,
    Unknown(String),
}

pub const HELP: &str = "\
commands:
  connect          connect and read the status
  disconnect       disconnect and stop reconnecting
  status <text>    write a status
  read             read the status
  history          show received signals
  gain [value]     show or set the alert volume
  quit             exit
answers (while a dialog is open): ok, ng, yo_ok";

/// Parse a console command.
pub fn parse_command(line: &str) -> Option<ConsoleCommand> {
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match (word, rest) {
        ("connect", "") => Some(ConsoleCommand::Connect),
        ("disconnect", "") => Some(ConsoleCommand::Disconnect),
        ("status", text) if !text.is_empty() => Some(ConsoleCommand::Status(text.to_string())),
        ("read", "") => Some(ConsoleCommand::Read),
        ("history", "") => Some(ConsoleCommand::History),
        ("gain", "") => Some(ConsoleCommand::Gain(None)),
        ("gain", value) => value.parse().ok().map(|v| ConsoleCommand::Gain(Some(v))),
        ("help" | "?", "") => Some(ConsoleCommand::Help),
        ("quit" | "exit", "") => Some(ConsoleCommand::Quit),
        _ => None,
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.to_lowercase().as_str(), "y" | "yes" | "ok")
}

/// Shared terminal state.
#[derive(Debug, Default)]
pub struct Terminal {
    dialogs: Mutex<Vec<SignalKind>>,
    pending: Mutex<Option<oneshot::Sender<bool>>>,
    no_color: bool,
}

impl Terminal {
    pub fn new(no_color: bool) -> Self {
        Self {
            no_color,
            ..Self::default()
        }
    }

    /// Kinds with an open dialog, oldest first.
    pub fn open_dialogs(&self) -> Vec<SignalKind> {
        self.dialogs.lock().map(|d| d.clone()).unwrap_or_default()
    }

    /// Route a line of input.
    pub fn handle_line(&self, line: &str) -> Input {
        let line = line.trim();

        if let Ok(mut pending) = self.pending.lock()
            && let Some(answer) = pending.take()
        {
            let _ = answer.send(is_yes(line));
            return Input::Answered;
        }

        if line.is_empty() {
            return Input::Empty;
        }

        if let Ok(decision) = line.parse::<Decision>() {
            if self.open_dialogs().contains(&decision.signal_kind()) {
                return Input::Decide(decision);
            }
            debug!(?decision, "No open dialog for decision");
            return Input::Unknown(line.to_string());
        }

        match parse_command(line) {
            Some(command) => Input::Command(command),
            None => Input::Unknown(line.to_string()),
        }
    }

    fn highlight(&self, text: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            text.bold().yellow().to_string()
        }
    }
}

impl DialogHost for Terminal {
    fn open(&self, kind: SignalKind) {
        if let Ok(mut dialogs) = self.dialogs.lock() {
            dialogs.retain(|k| *k != kind);
            dialogs.push(kind);
        }

        let body = match kind {
            SignalKind::Call => CALL_BODY,
            SignalKind::Yo => YO_BODY,
        };
        let choices: Vec<_> = kind.decisions().iter().map(|d| d.token()).collect();
        println!(
            "{} {} [{}]",
            self.highlight(&format!("[{}]", kind.title())),
            body.replace('\n', " "),
            choices.join(" / ")
        );
    }

    fn close(&self, kind: SignalKind) {
        if let Ok(mut dialogs) = self.dialogs.lock() {
            dialogs.retain(|k| *k != kind);
        }
    }
}

#[async_trait]
impl Prompt for Terminal {
    async fn confirm(&self, message: &str) -> bool {
        let (tx, rx) = oneshot::channel();
        match self.pending.lock() {
            Ok(mut pending) => *pending = Some(tx),
            Err(_) => return false,
        }
        println!("{} [y/N]", self.highlight(&message.replace('\n', " ")));
        rx.await.unwrap_or(false)
    }
}

/// Render history rows, newest first.
pub fn format_history<'a>(
    entries: impl IntoIterator<Item = &'a HistoryEntry>,
    no_color: bool,
) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

    let mut out = format!("{:<19}  {:<5}  {}\n", "TIME", "TITLE", "RESPONSE");
    let mut count = 0;
    for entry in entries {
        let when = entry
            .time
            .to_offset(offset)
            .format(&format)
            .unwrap_or_else(|_| entry.time.unix_timestamp().to_string());
        let response = match &entry.response {
            Some(response) => response.clone(),
            None if no_color => "-".to_string(),
            None => "-".dimmed().to_string(),
        };
        out.push_str(&format!("{:<19}  {:<5}  {}\n", when, entry.title, response));
        count += 1;
    }
    if count == 0 {
        out.push_str("(no signals yet)\n");
    }
    out
}
