//! Desktop notifications via notify-rust.
//!
//! On Linux and the BSDs notifications go through the freedesktop server,
//! which reports button presses back; each tag owns a fixed notification id
//! so a new signal replaces the pending one. Each shown notification gets a
//! detached waiter thread; a resident notification nobody clicks keeps its
//! waiter blocked, so waiters stay off the runtime's blocking pool and never
//! hold up shutdown. Elsewhere notifications are
//! shown without interaction reporting and the terminal dialog takes the
//! decision.

use notify_rust::Notification;
use roomstatus_core::{
    Capability, Error, Interaction, InteractionSender, NotificationBackend, Result,
};
use roomstatus_types::relay::NOTIFICATION_TITLE;
use roomstatus_types::{NotificationRequest, SignalKind};
use tracing::{debug, warn};

/// Action name the freedesktop server reports for a click on the body.
const DEFAULT_ACTION: &str = "default";

/// Action name notify-rust reports when the notification is closed.
const CLOSED_ACTION: &str = "__closed";

/// Stable notification id for a tag.
pub fn notification_id(tag: &str) -> u32 {
    match SignalKind::from_tag(tag) {
        Some(SignalKind::Call) => 1,
        Some(SignalKind::Yo) => 2,
        None => 3,
    }
}

/// Map a reported action to an interaction. Closing is not an interaction.
pub fn interaction_for(tag: &str, action: &str, action_count: usize) -> Option<Interaction> {
    match action {
        CLOSED_ACTION => None,
        DEFAULT_ACTION => Some(Interaction::new(tag, "", action_count)),
        other => Some(Interaction::new(tag, other, action_count)),
    }
}

/// [`NotificationBackend`] for the desktop notification service.
#[derive(Debug, Clone, Copy)]
pub struct DesktopNotifications {
    available: bool,
}

impl DesktopNotifications {
    /// Probe the notification service. `enabled = false` reports the backend
    /// as unavailable without probing.
    pub fn new(enabled: bool) -> Self {
        let available = enabled && server_available();
        debug!(enabled, available, "Desktop notifications");
        Self { available }
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn server_available() -> bool {
    match notify_rust::get_server_information() {
        Ok(info) => {
            debug!(server = %info.name, "Notification server found");
            true
        }
        Err(e) => {
            warn!(error = %e, "No notification server");
            false
        }
    }
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn server_available() -> bool {
    true
}

impl NotificationBackend for DesktopNotifications {
    fn available(&self) -> bool {
        self.available
    }

    fn show(&self, request: &NotificationRequest, interactions: InteractionSender) -> Result<()> {
        let mut notification = Notification::new();
        notification
            .appname(NOTIFICATION_TITLE)
            .summary(&request.title)
            .body(&request.options.body);

        #[cfg(all(unix, not(target_os = "macos")))]
        {
            use notify_rust::{Hint, Timeout};

            notification
                .id(notification_id(&request.options.tag))
                .action(DEFAULT_ACTION, "");
            if request.options.require_interaction {
                notification.timeout(Timeout::Never).hint(Hint::Resident(true));
            }
            for action in request.options.actions.iter().flatten() {
                notification.action(&action.action, &action.title);
            }

            let handle = notification.show().map_err(|e| {
                warn!(error = %e, "Failed to show notification");
                Error::CapabilityUnavailable(Capability::Notifications)
            })?;

            let tag = request.options.tag.clone();
            let action_count = request.options.action_count();
            let waiter = std::thread::Builder::new()
                .name(format!("notify-{tag}"))
                .spawn(move || {
                    handle.wait_for_action(|action| {
                        debug!(tag = %tag, action, "Notification action");
                        if let Some(interaction) = interaction_for(&tag, action, action_count)
                            && interactions.send(interaction).is_err()
                        {
                            debug!("Notification replaced, dropping interaction");
                        }
                    });
                });
            if let Err(e) = waiter {
                warn!(error = %e, "Failed to start notification waiter");
            }
        }

        #[cfg(not(all(unix, not(target_os = "macos"))))]
        {
            drop(interactions);
            notification.show().map(|_| ()).map_err(|e| {
                warn!(error = %e, "Failed to show notification");
                Error::CapabilityUnavailable(Capability::Notifications)
            })?;
        }

        debug!(tag = %request.options.tag, "Notification shown");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_stable_per_tag() {
        assert_eq!(notification_id("call"), notification_id("call"));
        assert_ne!(notification_id("call"), notification_id("yo"));
    }

    #[test]
    fn test_close_is_not_an_interaction() {
        assert_eq!(interaction_for("call", CLOSED_ACTION, 2), None);
    }

    #[test]
    fn test_body_click_has_empty_action() {
        let interaction = interaction_for("yo", DEFAULT_ACTION, 0).unwrap();
        assert_eq!(interaction, Interaction::new("yo", "", 0));
    }

    #[test]
    fn test_button_press_keeps_action() {
        let interaction = interaction_for("call", "ng", 2).unwrap();
        assert_eq!(interaction.action, "ng");
        assert_eq!(interaction.action_count, 2);
    }

    #[test]
    fn test_disabled_backend_is_unavailable() {
        assert!(!DesktopNotifications::new(false).available());
    }
}
