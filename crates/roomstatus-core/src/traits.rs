//! Trait seams between the core and its host.
//!
//! - [`LinkTransport`] abstracts the BLE stack so the link client can run
//!   against btleplug or the mock transport.
//! - [`LinkHandler`] is the capability the link client calls into when a
//!   signal arrives or the link drops.
//! - [`ResponseWriter`] is what the response router needs from the link.
//! - [`PreferenceStore`] persists the handful of string preferences.

use async_trait::async_trait;
use futures::stream::BoxStream;
use uuid::Uuid;

use roomstatus_types::SignalEvent;

use crate::error::Result;

/// Stream of raw notification payloads for one characteristic.
pub type NotificationStream = BoxStream<'static, Vec<u8>>;

/// Stream that yields once per disconnection of the selected peer.
pub type DropStream = BoxStream<'static, ()>;

/// Identity of the selected peripheral.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    /// Platform identifier (MAC address, or CoreBluetooth UUID on macOS).
    pub id: String,
    /// Advertised name, when known.
    pub name: Option<String>,
}

impl PeerInfo {
    /// Name if known, identifier otherwise.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// BLE operations the link client is built on.
///
/// Implementations hold at most one selected peer. `select_device` chooses
/// it; every other method works against that peer.
#[async_trait]
pub trait LinkTransport: Send + Sync + 'static {
    /// Fail with [`crate::Error::CapabilityUnavailable`] when there is no usable adapter.
    async fn check_available(&self) -> Result<()>;

    /// Choose the peer. Fails with [`crate::Error::NoDeviceSelected`] when
    /// nothing was chosen.
    async fn select_device(&self) -> Result<PeerInfo>;

    /// Connect to the selected peer and discover its characteristics.
    async fn open_session(&self) -> Result<()>;

    /// Whether the BLE stack reports an open session.
    async fn is_session_open(&self) -> bool;

    /// Disconnect from the selected peer.
    async fn close_session(&self) -> Result<()>;

    /// Read a characteristic.
    async fn read(&self, uuid: Uuid) -> Result<Vec<u8>>;

    /// Write a characteristic, waiting for the peer's response.
    async fn write(&self, uuid: Uuid, data: &[u8]) -> Result<()>;

    /// Subscribe to change notifications on a characteristic.
    async fn notifications(&self, uuid: Uuid) -> Result<NotificationStream>;

    /// Disconnection events for the selected peer.
    async fn drops(&self) -> Result<DropStream>;
}

/// Receiver for link callbacks.
///
/// Called from the link client's background tasks; implementations should
/// hand the work off (for example over a channel) rather than block.
pub trait LinkHandler: Send + Sync {
    /// A call-signal notification was classified.
    fn on_signal(&self, event: SignalEvent);

    /// The session dropped unexpectedly while auto-reconnect was enabled.
    fn on_drop(&self);
}

/// Sink for routed responses.
#[async_trait]
pub trait ResponseWriter: Send + Sync {
    /// Write a response to the peripheral's content channel.
    async fn write_response(&self, text: &str) -> Result<()>;
}

/// Key/value string preferences.
pub trait PreferenceStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}
