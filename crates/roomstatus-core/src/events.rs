//! Link event system for connection status indicators.
//!
//! The link client broadcasts a [`LinkEvent`] on every lifecycle change so
//! that any number of observers (status line, logs, tests) can follow it.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted by the link client.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum LinkEvent {
    /// A peer was selected.
    Paired { id: String, name: Option<String> },
    /// Session established and call-signal notifications subscribed.
    Connected { id: String },
    /// Session closed.
    Disconnected { id: String, reason: DisconnectReason },
    /// Automatic reconnect started after a drop.
    ReconnectStarted { id: String },
    /// Automatic reconnect and status resync succeeded.
    ReconnectSucceeded { id: String },
    /// Automatic reconnect failed; no further attempt is made.
    ReconnectFailed { id: String, error: String },
}

/// Reason for disconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// The user asked to disconnect.
    UserRequested,
    /// The link dropped on its own.
    Unexpected,
}

/// Sender for link events.
pub type EventSender = broadcast::Sender<LinkEvent>;

/// Receiver for link events.
pub type EventReceiver = broadcast::Receiver<LinkEvent>;

/// Event dispatcher for sending events to multiple receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: LinkEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatcher_fans_out() {
        let dispatcher = EventDispatcher::default();
        let mut a = dispatcher.subscribe();
        let mut b = dispatcher.subscribe();
        assert_eq!(dispatcher.receiver_count(), 2);

        dispatcher.send(LinkEvent::Connected { id: "peer".into() });

        assert_eq!(a.recv().await.unwrap(), LinkEvent::Connected { id: "peer".into() });
        assert_eq!(b.recv().await.unwrap(), LinkEvent::Connected { id: "peer".into() });
    }

    #[test]
    fn test_send_without_receivers_is_ignored() {
        let dispatcher = EventDispatcher::new(4);
        dispatcher.send(LinkEvent::ReconnectStarted { id: "peer".into() });
    }

    #[test]
    fn test_event_serialization() {
        let event = LinkEvent::Disconnected {
            id: "AA:BB".into(),
            reason: DisconnectReason::Unexpected,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "disconnected");
        assert_eq!(json["reason"], "unexpected");
    }
}
