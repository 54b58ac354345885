//! Message types for front-end/session communication.
//!
//! # Architecture
//!
//! ```text
//! +------------------+     Command      +------------------+
//! |    Front end     | --------------> |     Session      |
//! | (terminal, CLI)  |                 |  (tokio task)    |
//! |                  | <-------------- |                  |
//! +------------------+  SessionEvent   +------------------+
//!                                          ^
//!                                          | RelayReply
//!                                  +------------------+
//!                                  | NotificationRelay|
//!                                  +------------------+
//! ```

use roomstatus_types::{Decision, MessageSettings, SignalKind};

use crate::alert::AlertOutcome;
use crate::traits::PeerInfo;

/// Commands sent from the front end to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Open the audio output, pair and connect, then read the status.
    Connect,

    /// Disconnect and disable auto-reconnect.
    Disconnect,

    /// Connect if needed and write a status.
    SetStatus(String),

    /// Connect if needed and read the status channel.
    ReadStatus,

    /// A decision taken in the foreground dialog.
    Decide(Decision),

    /// Change and persist the alert gain.
    SetGain(f32),

    /// Replace the response strings.
    SetMessages(MessageSettings),

    /// Stop the session loop.
    Shutdown,
}

/// Events sent from the session back to the front end.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Session open.
    Connected {
        /// The paired peer.
        peer: PeerInfo,
    },

    /// Disconnect finished.
    Disconnected {
        /// Whether a session was actually torn down.
        closed: bool,
    },

    /// The link dropped (reconnect, if enabled, runs on its own).
    LinkDropped,

    /// Automatic reconnect after a drop succeeded and the status was re-sent.
    Reconnected,

    /// Automatic reconnect failed. No further attempt is made.
    ReconnectFailed {
        /// Error message.
        message: String,
    },

    /// Status channel value.
    Status(String),

    /// A signal was surfaced.
    Alerted {
        kind: SignalKind,
        outcome: AlertOutcome,
    },

    /// A response was written back.
    Responded {
        decision: Decision,
        response: String,
    },

    /// Gain changed.
    GainChanged(f32),

    /// An operation failed.
    Error {
        /// What was being done.
        context: String,
        /// Error message.
        message: String,
        /// Whether the error belongs in the status line.
        user_facing: bool,
    },
}
