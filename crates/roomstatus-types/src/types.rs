//! Core types shared by the link, the alert path and the response path.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ParseError;
use crate::uuid::{CALL_SIGNAL, CONTENT, STATUS};

/// Logical GATT channel on the peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Channel {
    /// Free-text status shown on the peripheral display.
    Status,
    /// Response text shown on the peripheral display.
    Content,
    /// Notify-only channel that carries call/yo signals.
    CallSignal,
}

impl Channel {
    /// Characteristic UUID backing this channel.
    #[must_use]
    pub fn uuid(self) -> Uuid {
        match self {
            Channel::Status => STATUS,
            Channel::Content => CONTENT,
            Channel::CallSignal => CALL_SIGNAL,
        }
    }

    /// Channel backed by a characteristic UUID, if any.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Option<Self> {
        [Channel::Status, Channel::Content, Channel::CallSignal]
            .into_iter()
            .find(|c| c.uuid() == uuid)
    }

    /// Whether request/response reads and writes are allowed.
    ///
    /// The call-signal channel is only observed through notifications.
    #[must_use]
    pub fn is_read_write(self) -> bool {
        matches!(self, Channel::Status | Channel::Content)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Status => write!(f, "status"),
            Channel::Content => write!(f, "content"),
            Channel::CallSignal => write!(f, "call-signal"),
        }
    }
}

impl FromStr for Channel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "status" => Ok(Channel::Status),
            "content" => Ok(Channel::Content),
            "call" | "call-signal" | "call_signal" => Ok(Channel::CallSignal),
            _ => Err(ParseError::UnknownChannel(s.to_string())),
        }
    }
}

/// Kind of signal raised by the peripheral's buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SignalKind {
    /// Someone is calling and expects an ok/busy answer.
    Call,
    /// A lightweight "yo" that only needs acknowledging.
    Yo,
}

impl SignalKind {
    /// Payload the peripheral writes for a call.
    pub const CALLING_PAYLOAD: &'static str = "calling";
    /// Payload the peripheral writes for a yo.
    pub const YO_PAYLOAD: &'static str = "yo";
    /// Payload the peripheral writes when a call is cancelled.
    pub const NONE_PAYLOAD: &'static str = "none";

    /// Classify decoded call-signal text.
    ///
    /// `"none"` (the peripheral's reset value) and anything else unknown
    /// yield `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use roomstatus_types::SignalKind;
    ///
    /// assert_eq!(SignalKind::from_payload("calling"), Some(SignalKind::Call));
    /// assert_eq!(SignalKind::from_payload("yo"), Some(SignalKind::Yo));
    /// assert_eq!(SignalKind::from_payload("none"), None);
    /// ```
    #[must_use]
    pub fn from_payload(text: &str) -> Option<Self> {
        match text {
            Self::CALLING_PAYLOAD => Some(SignalKind::Call),
            Self::YO_PAYLOAD => Some(SignalKind::Yo),
            _ => None,
        }
    }

    /// Notification tag; a new notification with the same tag replaces the old one.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            SignalKind::Call => "call",
            SignalKind::Yo => "yo",
        }
    }

    /// Title used for history rows.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            SignalKind::Call => "Call",
            SignalKind::Yo => "Yo",
        }
    }

    /// Decisions a user can take for this kind, in display order.
    #[must_use]
    pub fn decisions(self) -> &'static [Decision] {
        match self {
            SignalKind::Call => &[Decision::Ok, Decision::Ng],
            SignalKind::Yo => &[Decision::YoOk],
        }
    }

    /// Look up a kind by its notification tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "call" => Some(SignalKind::Call),
            "yo" => Some(SignalKind::Yo),
            _ => None,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// A signal observed on the call-signal channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SignalEvent {
    /// What was signalled.
    pub kind: SignalKind,
    /// When the notification arrived.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
}

impl SignalEvent {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn now(kind: SignalKind) -> Self {
        Self {
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Create an event with an explicit timestamp.
    #[must_use]
    pub fn at(kind: SignalKind, timestamp: OffsetDateTime) -> Self {
        Self { kind, timestamp }
    }
}

/// A user's answer to a signal.
///
/// The wire tokens (`ok`, `ng`, `yo_ok`) are shared by the notification
/// actions, the relay reply and the in-terminal dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Decision {
    /// Available; answer with the ok response.
    #[cfg_attr(feature = "serde", serde(rename = "ok"))]
    Ok,
    /// Busy; answer with the busy response.
    #[cfg_attr(feature = "serde", serde(rename = "ng"))]
    Ng,
    /// Acknowledge a yo with the confirm response.
    #[cfg_attr(feature = "serde", serde(rename = "yo_ok"))]
    YoOk,
}

impl Decision {
    /// Wire token for this decision.
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Decision::Ok => "ok",
            Decision::Ng => "ng",
            Decision::YoOk => "yo_ok",
        }
    }

    /// Signal kind this decision answers.
    #[must_use]
    pub fn signal_kind(self) -> SignalKind {
        match self {
            Decision::Ok | Decision::Ng => SignalKind::Call,
            Decision::YoOk => SignalKind::Yo,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Decision {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(Decision::Ok),
            "ng" => Ok(Decision::Ng),
            "yo_ok" => Ok(Decision::YoOk),
            _ => Err(ParseError::UnknownDecision(s.to_string())),
        }
    }
}

/// One row of the in-session history log.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HistoryEntry {
    /// When the signal was observed.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub time: OffsetDateTime,
    /// `"Call"` or `"Yo"`.
    pub title: String,
    /// Response text, once a decision was routed.
    pub response: Option<String>,
}

impl HistoryEntry {
    /// Unresolved entry for a signal.
    #[must_use]
    pub fn from_signal(event: &SignalEvent) -> Self {
        Self {
            time: event.timestamp,
            title: event.kind.title().to_string(),
            response: None,
        }
    }

    /// Whether a response has been recorded.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.response.is_some()
    }
}

/// Default response when available.
pub const DEFAULT_RESPONSE_OK: &str = "対応可能です！少々お待ちください";
/// Default response when busy.
pub const DEFAULT_RESPONSE_BUSY: &str = "取り込み中です… 要件をお願いします";
/// Default acknowledgement for a yo.
pub const DEFAULT_RESPONSE_CONFIRM: &str = "確認しました";

/// Canned response strings written back to the peripheral.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MessageSettings {
    /// Sent for [`Decision::Ok`].
    pub ok: String,
    /// Sent for [`Decision::Ng`].
    pub busy: String,
    /// Sent for [`Decision::YoOk`].
    pub confirm: String,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            ok: DEFAULT_RESPONSE_OK.to_string(),
            busy: DEFAULT_RESPONSE_BUSY.to_string(),
            confirm: DEFAULT_RESPONSE_CONFIRM.to_string(),
        }
    }
}

impl MessageSettings {
    /// Response text for a decision.
    #[must_use]
    pub fn response_for(&self, decision: Decision) -> &str {
        match decision {
            Decision::Ok => &self.ok,
            Decision::Ng => &self.busy,
            Decision::YoOk => &self.confirm,
        }
    }
}

/// Decode a payload received from the peripheral.
pub fn decode_payload(bytes: &[u8]) -> Result<String, ParseError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| ParseError::InvalidPayload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_kind_from_payload() {
        assert_eq!(SignalKind::from_payload("calling"), Some(SignalKind::Call));
        assert_eq!(SignalKind::from_payload("yo"), Some(SignalKind::Yo));
        assert_eq!(SignalKind::from_payload("none"), None);
        assert_eq!(SignalKind::from_payload("Calling"), None);
        assert_eq!(SignalKind::from_payload(""), None);
    }

    #[test]
    fn test_channel_from_uuid() {
        assert_eq!(Channel::from_uuid(crate::uuid::CONTENT), Some(Channel::Content));
        assert_eq!(Channel::from_uuid(crate::uuid::ROOM_STATUS_SERVICE), None);
    }

    #[test]
    fn test_signal_kind_tags_round_trip() {
        for kind in [SignalKind::Call, SignalKind::Yo] {
            assert_eq!(SignalKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(SignalKind::from_tag("other"), None);
    }

    #[test]
    fn test_signal_kind_decisions() {
        assert_eq!(SignalKind::Call.decisions(), &[Decision::Ok, Decision::Ng]);
        assert_eq!(SignalKind::Yo.decisions(), &[Decision::YoOk]);
    }

    #[test]
    fn test_decision_answers_its_kind() {
        for kind in [SignalKind::Call, SignalKind::Yo] {
            assert!(kind.decisions().iter().all(|d| d.signal_kind() == kind));
        }
    }

    #[test]
    fn test_decision_tokens() {
        assert_eq!("ok".parse::<Decision>().unwrap(), Decision::Ok);
        assert_eq!("ng".parse::<Decision>().unwrap(), Decision::Ng);
        assert_eq!("yo_ok".parse::<Decision>().unwrap(), Decision::YoOk);

        let err = "maybe".parse::<Decision>().unwrap_err();
        assert_eq!(err, ParseError::UnknownDecision("maybe".to_string()));
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn test_channel_properties() {
        assert!(Channel::Status.is_read_write());
        assert!(Channel::Content.is_read_write());
        assert!(!Channel::CallSignal.is_read_write());
        assert_eq!(Channel::Content.uuid(), CONTENT);
        assert_eq!("STATUS".parse::<Channel>().unwrap(), Channel::Status);
        assert!("display".parse::<Channel>().is_err());
    }

    #[test]
    fn test_message_settings_mapping() {
        let settings = MessageSettings {
            ok: "coming".to_string(),
            busy: "later".to_string(),
            confirm: "seen".to_string(),
        };
        assert_eq!(settings.response_for(Decision::Ok), "coming");
        assert_eq!(settings.response_for(Decision::Ng), "later");
        assert_eq!(settings.response_for(Decision::YoOk), "seen");
    }

    #[test]
    fn test_history_entry_from_signal() {
        let event = SignalEvent::now(SignalKind::Yo);
        let entry = HistoryEntry::from_signal(&event);
        assert_eq!(entry.title, "Yo");
        assert_eq!(entry.time, event.timestamp);
        assert!(!entry.is_resolved());
    }

    #[test]
    fn test_decode_payload() {
        assert_eq!(decode_payload("呼出".as_bytes()).unwrap(), "呼出");
        assert!(decode_payload(&[0xff, 0xfe]).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_decision_serde_tokens() {
        assert_eq!(serde_json::to_string(&Decision::YoOk).unwrap(), "\"yo_ok\"");
        let d: Decision = serde_json::from_str("\"ng\"").unwrap();
        assert_eq!(d, Decision::Ng);
    }
}
