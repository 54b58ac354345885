//! Messages command implementation.

use anyhow::Result;
use roomstatus_types::MessageSettings;

use crate::config::Config;

/// Requested changes to the response messages.
#[derive(Debug, Clone, Default)]
pub struct MessageEdits {
    pub ok: Option<String>,
    pub busy: Option<String>,
    pub confirm: Option<String>,
    pub reset: bool,
}

impl MessageEdits {
    pub fn is_empty(&self) -> bool {
        !self.reset && self.ok.is_none() && self.busy.is_none() && self.confirm.is_none()
    }

    /// Apply the edits to `messages`.
    pub fn apply(self, messages: &mut MessageSettings) {
        if self.reset {
            *messages = MessageSettings::default();
            return;
        }
        if let Some(ok) = self.ok {
            messages.ok = ok;
        }
        if let Some(busy) = self.busy {
            messages.busy = busy;
        }
        if let Some(confirm) = self.confirm {
            messages.confirm = confirm;
        }
    }
}

/// Apply edits to the config (saving when anything changed) and print the
/// resulting messages.
pub fn cmd_messages(config: &mut Config, edits: MessageEdits) -> Result<()> {
    if !edits.is_empty() {
        edits.apply(&mut config.messages);
        config.save()?;
    }

    println!("ok:      {}", config.messages.ok);
    println!("busy:    {}", config.messages.busy);
    println!("confirm: {}", config.messages.confirm);
    Ok(())
}
