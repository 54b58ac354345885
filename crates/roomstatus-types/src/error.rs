//! Error types for parsing values received from the peripheral or the user.

use thiserror::Error;

/// Errors that can occur when interpreting text from the link or the UI.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// Call-signal payload that is neither a call nor a yo.
    #[error("Unrecognized signal: {0:?}")]
    UnknownSignal(String),

    /// Decision token outside of `ok`, `ng` and `yo_ok`.
    #[error("Unrecognized decision: {0:?}")]
    UnknownDecision(String),

    /// Channel name that does not match any GATT characteristic.
    #[error("Unknown channel: {0:?}")]
    UnknownChannel(String),

    /// Payload bytes were not valid UTF-8.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Result type alias using roomstatus-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
