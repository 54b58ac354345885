//! Core library for the RoomStatusMonitor call-button companion.
//!
//! This crate talks to the peripheral over Bluetooth Low Energy and turns
//! its call/yo signals into alerts and written-back responses.
//!
//! # Features
//!
//! - **Link client**: pairing, connection lifecycle, status/content channel
//!   I/O, call-signal classification, one-shot reconnect with status resync
//! - **Alert presenter**: history rows, an alert melody, notifications with
//!   dialog and confirm fallbacks
//! - **Response router**: decision tokens to canned responses
//! - **Notification relay**: an actor that shows notifications and relays
//!   the chosen action to the foreground
//! - **Session**: the composition root that ties it all together
//!
//! # Platform Differences
//!
//! - **macOS**: peers are identified by a CoreBluetooth UUID, stable for a
//!   given Mac only.
//! - **Linux/Windows**: peers are identified by their MAC address.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use roomstatus_core::btle::{BtleTransport, ConnectionConfig};
//! use roomstatus_core::{LinkClient, NoopHandler};
//! use roomstatus_types::Channel;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Arc::new(BtleTransport::new(ConnectionConfig::default()));
//!     let link = LinkClient::new(transport, Arc::new(NoopHandler));
//!
//!     link.connect().await?;
//!     link.set_status("会議中").await?;
//!     println!("status: {}", link.read_channel(Channel::Status).await?);
//!     link.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod alert;
pub mod btle;
pub mod error;
pub mod events;
pub mod history;
pub mod link;
pub mod messages;
pub mod mock;
pub mod relay;
pub mod router;
pub mod session;
pub mod settings;
pub mod tone;
pub mod traits;

pub use roomstatus_types::types;
pub use roomstatus_types::uuid;

pub use alert::{AlertOutcome, AlertPresenter, DialogHost, Notifier, Prompt};
pub use btle::{BtleTransport, ConnectionConfig};
pub use error::{Capability, Error, Result};
pub use events::{DisconnectReason, EventDispatcher, EventReceiver, EventSender, LinkEvent};
pub use history::History;
pub use link::{Connection, LinkClient};
pub use messages::{Command, SessionEvent};
pub use mock::MockTransport;
pub use relay::{
    ChannelClient, ClientOpener, Interaction, InteractionSender, NotificationBackend,
    NotificationRelay, RelayClient, RelayHandle, decide_action,
};
pub use router::ResponseRouter;
pub use session::{NoopHandler, Session, SessionBuilder, SessionHandle};
pub use settings::{GainSetting, MemoryPreferences};
pub use tone::{AudioBackend, AudioOutput, TonePlayer};
pub use traits::{LinkHandler, LinkTransport, PeerInfo, PreferenceStore, ResponseWriter};
