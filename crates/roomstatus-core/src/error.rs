//! Error types for roomstatus-core.
//!
//! # Error Handling Policy
//!
//! | Error Type | Handling | Rationale |
//! |------------|----------|-----------|
//! | [`Error::CapabilityUnavailable`] | Show in status line, no retry | Host lacks Bluetooth or notifications |
//! | [`Error::NoDeviceSelected`] | Show in status line, no retry | User cancelled pairing |
//! | [`Error::ConnectionFailed`] | One reconnect-and-resync after a drop | Peripheral may be briefly out of range |
//! | [`Error::ChannelError`] | Log, surface to the caller | Session not active or channel misuse |
//! | [`Error::UnrecognizedInput`] | Log only | Unknown signal text or decision token |
//! | [`Error::Timeout`] | Log, surface to the caller | BLE congestion |
//!
//! Only the link client's drop handler retries, and only once per drop.

use std::time::Duration;

use thiserror::Error;

use roomstatus_types::{Channel, ParseError};

/// Host capabilities the companion depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Bluetooth adapter.
    Bluetooth,
    /// Desktop notifications.
    Notifications,
    /// Audio output for the alert tone.
    Audio,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bluetooth => write!(f, "Bluetooth"),
            Self::Notifications => write!(f, "notifications"),
            Self::Audio => write!(f, "audio output"),
        }
    }
}

/// Errors that can occur in the companion core.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A host capability is missing.
    #[error("{0} is not available on this host")]
    CapabilityUnavailable(Capability),

    /// Pairing was cancelled or no matching peripheral was chosen.
    #[error("No device selected")]
    NoDeviceSelected,

    /// Connecting to the peripheral failed.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// Peer identifier, when known.
        device_id: Option<String>,
        /// What went wrong.
        reason: String,
    },

    /// A read or write against a channel failed.
    #[error("Channel {channel} error: {reason}")]
    ChannelError {
        /// Channel being accessed.
        channel: Channel,
        /// What went wrong.
        reason: String,
    },

    /// Signal text or decision token that the core does not understand.
    #[error("Unrecognized input: {0}")]
    UnrecognizedInput(String),

    /// Operation attempted without an active session.
    #[error("Not connected to device")]
    NotConnected,

    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// Preference storage failed.
    #[error("Preference store error: {0}")]
    Store(String),

    /// A component's peer task is gone.
    #[error("Channel closed: {0}")]
    Closed(&'static str),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a connection failure.
    pub fn connection_failed(device_id: Option<String>, reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            device_id,
            reason: reason.into(),
        }
    }

    /// Create a channel error.
    pub fn channel(channel: Channel, reason: impl Into<String>) -> Self {
        Self::ChannelError {
            channel,
            reason: reason.into(),
        }
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Whether the error should be shown to the user rather than only logged.
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::CapabilityUnavailable(_)
                | Self::NoDeviceSelected
                | Self::ConnectionFailed { .. }
                | Self::NotConnected
        )
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::UnrecognizedInput(err.to_string())
    }
}

/// Result type alias using roomstatus-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
