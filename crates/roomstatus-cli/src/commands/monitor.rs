//! Monitor command: the interactive foreground session.
//!
//! Connects, then multiplexes three things until `quit`, end of input or
//! Ctrl-C: stdin lines (dialog answers, confirm answers, console commands),
//! session events, and the interrupt signal.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use roomstatus_core::{
    AlertOutcome, Command, GainSetting, NotificationRelay, PreferenceStore, SessionBuilder,
    SessionEvent, SessionHandle,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::audio;
use crate::commands::gain::validate_gain;
use crate::config::{Config, update_last_status};
use crate::notify::DesktopNotifications;
use crate::terminal::{ConsoleCommand, HELP, Input, Terminal, format_history};
use crate::util::{build_transport, open_preferences};

/// How long to wait for the session and relay to wind down.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Options for [`cmd_monitor`].
#[derive(Debug, Clone)]
pub struct MonitorArgs {
    pub device: Option<String>,
    pub scan_timeout: u64,
    pub notifications: bool,
    /// Use the yes/no prompt instead of the dialog.
    pub confirm: bool,
    pub quiet: bool,
    pub no_color: bool,
}

pub async fn cmd_monitor(args: MonitorArgs, config: &Config) -> Result<()> {
    let transport = Arc::new(build_transport(args.device.clone(), args.scan_timeout));
    let preferences: Arc<dyn PreferenceStore> = open_preferences()?;
    let terminal = Arc::new(Terminal::new(args.no_color));

    let mut builder = SessionBuilder::new(
        transport,
        Arc::clone(&preferences),
        audio::default_backend(),
        terminal.clone(),
    )
    .messages(config.messages.clone())
    .history_limit(config.history_limit)
    .resync_status(config.last_status.clone());

    if !args.confirm {
        builder = builder.dialog(terminal.clone());
    }

    let relay_task = if args.notifications {
        let backend = Arc::new(DesktopNotifications::new(true));
        let (relay, task) = NotificationRelay::new(backend).spawn();
        builder = builder.relay(relay);
        Some(task)
    } else {
        None
    };

    let (session, handle, mut events) = builder.build()?;
    let session_task = tokio::spawn(session.run());

    info!("Monitor started");
    if !args.quiet {
        eprintln!("Type 'help' for commands.");
    }
    handle.send(Command::Connect).await?;

    let mut console = Console {
        handle: &handle,
        terminal: &terminal,
        gain: GainSetting::new(preferences),
        pending_status: None,
        args: &args,
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read input")? {
                    Some(line) => {
                        if !console.handle_line(&line).await? {
                            break;
                        }
                    }
                    None => {
                        debug!("Input closed");
                        break;
                    }
                }
            }
            event = events.recv() => match event {
                Some(event) => console.handle_event(event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    handle.shutdown();
    drop(console);
    drop(handle);
    if tokio::time::timeout(SHUTDOWN_GRACE, session_task).await.is_err() {
        warn!("Session did not stop in time");
    }
    if let Some(task) = relay_task
        && tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err()
    {
        warn!("Notification relay did not stop in time");
    }
    Ok(())
}

struct Console<'a> {
    handle: &'a SessionHandle,
    terminal: &'a Terminal,
    gain: GainSetting,
    pending_status: Option<String>,
    args: &'a MonitorArgs,
}

impl Console<'_> {
    /// Returns `false` when the user asked to quit.
    async fn handle_line(&mut self, line: &str) -> Result<bool> {
        match self.terminal.handle_line(line) {
            Input::Answered | Input::Empty => {}
            Input::Decide(decision) => self.handle.send(Command::Decide(decision)).await?,
            Input::Unknown(text) => eprintln!("Unknown input '{text}'. Type 'help' for commands."),
            Input::Command(command) => return self.run(command).await,
        }
        Ok(true)
    }

    async fn run(&mut self, command: ConsoleCommand) -> Result<bool> {
        match command {
            ConsoleCommand::Connect => self.handle.send(Command::Connect).await?,
            ConsoleCommand::Disconnect => self.handle.send(Command::Disconnect).await?,
            ConsoleCommand::Status(text) => {
                self.pending_status = Some(text.clone());
                self.handle.send(Command::SetStatus(text)).await?;
            }
            ConsoleCommand::Read => self.handle.send(Command::ReadStatus).await?,
            ConsoleCommand::History => {
                let history = self.handle.history().read().await;
                print!("{}", format_history(history.entries(), self.args.no_color));
            }
            ConsoleCommand::Gain(None) => println!("gain: {}", self.gain.load()),
            ConsoleCommand::Gain(Some(gain)) => match validate_gain(gain) {
                Ok(()) => self.handle.send(Command::SetGain(gain)).await?,
                Err(e) => eprintln!("{e}"),
            },
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn handle_event(&mut self, event: SessionEvent) {
        if let SessionEvent::Status(status) = &event
            && self.pending_status.as_deref() == Some(status.as_str())
        {
            self.pending_status = None;
            if let Err(e) = update_last_status(status) {
                warn!("Failed to remember status: {e:#}");
            }
        }

        match &event {
            SessionEvent::Error { .. } | SessionEvent::ReconnectFailed { .. } => {
                if let Some(line) = describe_event(&event) {
                    if self.args.no_color {
                        eprintln!("{line}");
                    } else {
                        eprintln!("{}", line.red());
                    }
                }
            }
            _ if self.args.quiet => {}
            _ => {
                if let Some(line) = describe_event(&event) {
                    println!("{line}");
                }
            }
        }
    }
}

/// One-line description of a session event, if it is worth showing.
pub fn describe_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::Connected { peer } => Some(format!("Connected to {}", peer.display_name())),
        SessionEvent::Disconnected { closed: true } => Some("Disconnected".to_string()),
        SessionEvent::Disconnected { closed: false } => Some("Not connected".to_string()),
        SessionEvent::LinkDropped => Some("Connection lost".to_string()),
        SessionEvent::Reconnected => Some("Reconnected".to_string()),
        SessionEvent::ReconnectFailed { message } => Some(format!("Reconnect failed: {message}")),
        SessionEvent::Status(status) => Some(format!("Status: {status}")),
        SessionEvent::Alerted { kind, outcome } => match outcome {
            AlertOutcome::Notified => Some(format!("{} received (notification shown)", kind.title())),
            AlertOutcome::Dismissed => Some(format!("{} dismissed", kind.title())),
            AlertOutcome::DialogOpened | AlertOutcome::Decided(_) => None,
        },
        SessionEvent::Responded { response, .. } => Some(format!("Sent: {response}")),
        SessionEvent::GainChanged(gain) => Some(format!("Gain: {gain}")),
        SessionEvent::Error {
            context,
            message,
            user_facing,
        } => Some(if *user_facing {
            message.clone()
        } else {
            format!("Failed to {context}: {message}")
        }),
    }
}
