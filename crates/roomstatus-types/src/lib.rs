//! Platform-agnostic types for the RoomStatusMonitor call button.
//!
//! This crate provides the values shared by the link client, the alert and
//! response paths, and the notification relay:
//!
//! - GATT UUID constants for the peripheral's service and channels
//! - Signal kinds, signal events and user decisions
//! - History rows and canned response settings
//! - The notification relay's wire messages
//!
//! # Example
//!
//! ```
//! use roomstatus_types::{Decision, MessageSettings, SignalKind};
//!
//! let kind = SignalKind::from_payload("calling").unwrap();
//! assert_eq!(kind.tag(), "call");
//!
//! let settings = MessageSettings::default();
//! let decision: Decision = "yo_ok".parse().unwrap();
//! assert_eq!(settings.response_for(decision), settings.confirm);
//! ```

pub mod error;
pub mod relay;
pub mod types;
pub mod uuid;

pub use error::{ParseError, ParseResult};
pub use relay::{NotificationAction, NotificationOptions, NotificationRequest, RelayReply};
pub use types::{
    Channel, Decision, HistoryEntry, MessageSettings, SignalEvent, SignalKind, decode_payload,
};
pub use uuid as uuids;
