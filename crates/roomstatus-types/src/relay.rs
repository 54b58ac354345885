//! Messages exchanged between the foreground session and the notification relay.
//!
//! The field names match the JSON the relay speaks
//! (`requireInteraction`, optional `actions`), so the same values can be
//! logged or forwarded verbatim.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::{Decision, SignalKind};

/// Title shown on every notification.
pub const NOTIFICATION_TITLE: &str = "RoomStatusMonitor";

/// Body text for a call.
pub const CALL_BODY: &str = "呼び出しがありました\n対応できますか？";

/// Body text for a yo.
pub const YO_BODY: &str = "Yo されました";

/// A button on a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NotificationAction {
    /// Token relayed back when the button is pressed.
    pub action: String,
    /// Button label.
    pub title: String,
}

impl NotificationAction {
    /// Create an action.
    pub fn new(action: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            title: title.into(),
        }
    }
}

/// Display options for a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct NotificationOptions {
    /// Language of the body text.
    pub lang: String,
    /// Body text.
    pub body: String,
    /// Replacement key; same tag replaces the pending notification.
    pub tag: String,
    /// Alert again even when replacing.
    pub renotify: bool,
    /// Keep the notification until the user interacts with it.
    pub require_interaction: bool,
    /// Buttons, if any.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub actions: Option<Vec<NotificationAction>>,
}

impl NotificationOptions {
    /// Number of buttons on the notification.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.actions.as_ref().map_or(0, Vec::len)
    }
}

/// Foreground → relay: show a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NotificationRequest {
    /// Notification title.
    pub title: String,
    /// Display options.
    pub options: NotificationOptions,
}

impl NotificationRequest {
    /// Build the request for a signal kind.
    ///
    /// A call offers `ok`/`ng`; a yo offers a single acknowledgement.
    #[must_use]
    pub fn for_signal(kind: SignalKind) -> Self {
        let (body, actions) = match kind {
            SignalKind::Call => (
                CALL_BODY,
                vec![
                    NotificationAction::new(Decision::Ok.token(), "対応可能"),
                    NotificationAction::new(Decision::Ng.token(), "対応不可"),
                ],
            ),
            SignalKind::Yo => (
                YO_BODY,
                vec![NotificationAction::new(Decision::YoOk.token(), "確認")],
            ),
        };

        Self {
            title: NOTIFICATION_TITLE.to_string(),
            options: NotificationOptions {
                lang: "ja".to_string(),
                body: body.to_string(),
                tag: kind.tag().to_string(),
                renotify: true,
                require_interaction: true,
                actions: Some(actions),
            },
        }
    }

    /// Signal kind this request was built for, from its tag.
    #[must_use]
    pub fn kind(&self) -> Option<SignalKind> {
        SignalKind::from_tag(&self.options.tag)
    }
}

/// Relay → foreground: the action the user took.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RelayReply {
    /// `ok`, `ng` or `yo_ok` by convention; anything else is rejected downstream.
    pub action: String,
}

impl RelayReply {
    /// Create a reply.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
        }
    }
}
