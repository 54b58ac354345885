//! btleplug-backed transport.
//!
//! [`BtleTransport`] finds the peripheral by scanning, connects with
//! timeouts, caches the discovered characteristics and exposes value and
//! disconnection notifications as streams.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, PeripheralProperties,
    ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::StreamExt;
use tokio::sync::RwLock;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use uuid::Uuid;

use roomstatus_types::Channel;
use roomstatus_types::uuid::{DEVICE_NAME, ROOM_STATUS_SERVICE};

use crate::error::{Capability, Error, Result};
use crate::traits::{DropStream, LinkTransport, NotificationStream, PeerInfo};

/// Default timeout for BLE characteristic read operations.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for BLE characteristic write operations.
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for BLE connection operations.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for service discovery.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time spent looking for the peripheral.
const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for BLE connection timeouts.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use roomstatus_core::btle::ConnectionConfig;
///
/// let config = ConnectionConfig::default()
///     .connection_timeout(Duration::from_secs(20))
///     .write_timeout(Duration::from_secs(5));
/// assert_eq!(config.write_timeout, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Timeout for establishing a BLE connection.
    pub connection_timeout: Duration,
    /// Timeout for BLE read operations.
    pub read_timeout: Duration,
    /// Timeout for BLE write operations.
    pub write_timeout: Duration,
    /// Timeout for service discovery after connection.
    pub discovery_timeout: Duration,
    /// Total time spent scanning for the peripheral.
    pub scan_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    /// Set the connection timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the read timeout.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the write timeout.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the service discovery timeout.
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Set the scan timeout.
    #[must_use]
    pub fn scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }
}

/// Format a peripheral ID as a string.
///
/// On macOS, peripheral IDs are UUIDs; elsewhere they wrap the address.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    format!("{:?}", id)
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

/// Pick the identifier to show for a peripheral.
///
/// macOS reports `00:00:00:00:00:00` as the address, so the peripheral ID is
/// used there instead.
pub fn create_identifier(address: &str, peripheral_id: &PeripheralId) -> String {
    if is_placeholder_address(address) {
        format_peripheral_id(peripheral_id)
    } else {
        address.to_string()
    }
}

fn is_placeholder_address(address: &str) -> bool {
    address == "00:00:00:00:00:00"
}

/// Whether advertised properties look like the call button.
fn is_room_status_device(properties: &PeripheralProperties) -> bool {
    properties.services.contains(&ROOM_STATUS_SERVICE)
        || properties.service_data.contains_key(&ROOM_STATUS_SERVICE)
        || properties.local_name.as_deref() == Some(DEVICE_NAME)
}

/// Whether advertised properties match a user-supplied name or address.
fn matches_identifier(properties: &PeripheralProperties, id: &str, identifier_lower: &str) -> bool {
    if id.to_lowercase().contains(identifier_lower) {
        return true;
    }

    let address = properties.address.to_string().to_lowercase();
    if !is_placeholder_address(&address)
        && (address == identifier_lower
            || address.replace(':', "") == identifier_lower.replace(':', ""))
    {
        return true;
    }

    properties
        .local_name
        .as_ref()
        .is_some_and(|name| name.to_lowercase().contains(identifier_lower))
}

struct Selected {
    peripheral: Peripheral,
    characteristics: HashMap<Uuid, Characteristic>,
}

/// [`LinkTransport`] over the host's first Bluetooth adapter.
pub struct BtleTransport {
    config: ConnectionConfig,
    /// Name or address filter; `None` matches any call button.
    device: Option<String>,
    adapter: RwLock<Option<Adapter>>,
    selected: RwLock<Option<Selected>>,
}

impl std::fmt::Debug for BtleTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BtleTransport")
            .field("config", &self.config)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl BtleTransport {
    /// Create a transport that matches any advertising call button.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            device: None,
            adapter: RwLock::new(None),
            selected: RwLock::new(None),
        }
    }

    /// Restrict selection to a device name or address.
    #[must_use]
    pub fn with_device(mut self, device: Option<String>) -> Self {
        self.device = device.filter(|d| !d.trim().is_empty());
        self
    }

    /// The connection configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    async fn adapter(&self) -> Result<Adapter> {
        if let Some(adapter) = self.adapter.read().await.as_ref() {
            return Ok(adapter.clone());
        }

        let manager = Manager::new()
            .await
            .map_err(|_| Error::CapabilityUnavailable(Capability::Bluetooth))?;
        let adapter = manager
            .adapters()
            .await
            .map_err(|_| Error::CapabilityUnavailable(Capability::Bluetooth))?
            .into_iter()
            .next()
            .ok_or(Error::CapabilityUnavailable(Capability::Bluetooth))?;

        *self.adapter.write().await = Some(adapter.clone());
        Ok(adapter)
    }

    async fn peripheral(&self) -> Result<Peripheral> {
        self.selected
            .read()
            .await
            .as_ref()
            .map(|s| s.peripheral.clone())
            .ok_or(Error::NotConnected)
    }

    /// Search known peripherals for a match.
    async fn find_known(&self, adapter: &Adapter) -> Result<Option<(Peripheral, PeerInfo)>> {
        let filter = self.device.as_ref().map(|d| d.to_lowercase());

        for peripheral in adapter.peripherals().await? {
            let Ok(Some(props)) = peripheral.properties().await else {
                continue;
            };
            let id = format_peripheral_id(&peripheral.id());

            let matched = match &filter {
                Some(identifier) => matches_identifier(&props, &id, identifier),
                None => is_room_status_device(&props),
            };
            if matched {
                debug!(id = %id, name = ?props.local_name, "Matched peripheral");
                let info = PeerInfo {
                    id: create_identifier(&props.address.to_string(), &peripheral.id()),
                    name: props.local_name.clone(),
                };
                return Ok(Some((peripheral, info)));
            }
        }
        Ok(None)
    }

    async fn characteristic(&self, uuid: Uuid) -> Result<(Peripheral, Characteristic)> {
        let selected = self.selected.read().await;
        let selected = selected.as_ref().ok_or(Error::NotConnected)?;
        let characteristic = selected.characteristics.get(&uuid).cloned().ok_or_else(|| {
            match Channel::from_uuid(uuid) {
                Some(channel) => Error::channel(channel, "characteristic not found"),
                None => Error::UnrecognizedInput(format!("unknown characteristic {uuid}")),
            }
        })?;
        Ok((selected.peripheral.clone(), characteristic))
    }
}

#[async_trait]
impl LinkTransport for BtleTransport {
    async fn check_available(&self) -> Result<()> {
        self.adapter().await.map(|_| ())
    }

    #[tracing::instrument(level = "info", skip_all, fields(device = ?self.device))]
    async fn select_device(&self) -> Result<PeerInfo> {
        let adapter = self.adapter().await?;

        if let Some((peripheral, info)) = self.find_known(&adapter).await? {
            info!("Found device in cache (no scan needed)");
            self.select(peripheral).await;
            return Ok(info);
        }

        // Advertisements are easy to miss, so split the window into attempts.
        let max_attempts: u32 = 3;
        let step = (self.config.scan_timeout / max_attempts).max(Duration::from_secs(1));

        for attempt in 1..=max_attempts {
            info!(
                "Scan attempt {}/{} ({}s)...",
                attempt,
                max_attempts,
                step.as_secs()
            );
            adapter.start_scan(ScanFilter::default()).await?;
            sleep(step).await;
            adapter.stop_scan().await?;

            if let Some((peripheral, info)) = self.find_known(&adapter).await? {
                info!("Found device on attempt {}", attempt);
                self.select(peripheral).await;
                return Ok(info);
            }
        }

        warn!("No RoomStatusMonitor found after {} attempts", max_attempts);
        Err(Error::NoDeviceSelected)
    }

    async fn open_session(&self) -> Result<()> {
        let peripheral = self.peripheral().await?;

        info!("Connecting to device...");
        timeout(self.config.connection_timeout, peripheral.connect())
            .await
            .map_err(|_| Error::timeout("connect to device", self.config.connection_timeout))??;

        info!("Discovering services...");
        timeout(self.config.discovery_timeout, peripheral.discover_services())
            .await
            .map_err(|_| Error::timeout("discover services", self.config.discovery_timeout))??;

        let mut characteristics = HashMap::new();
        for service in peripheral.services() {
            debug!("  Service: {}", service.uuid);
            if service.uuid != ROOM_STATUS_SERVICE {
                continue;
            }
            for characteristic in service.characteristics {
                debug!("    Characteristic: {}", characteristic.uuid);
                characteristics.insert(characteristic.uuid, characteristic);
            }
        }

        if characteristics.is_empty() {
            let _ = peripheral.disconnect().await;
            return Err(Error::connection_failed(
                Some(format_peripheral_id(&peripheral.id())),
                "room status service not found",
            ));
        }
        debug!(
            "Cached {} characteristics for fast lookup",
            characteristics.len()
        );

        if let Some(selected) = self.selected.write().await.as_mut() {
            selected.characteristics = characteristics;
        }
        Ok(())
    }

    async fn is_session_open(&self) -> bool {
        match self.peripheral().await {
            Ok(peripheral) => peripheral.is_connected().await.unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn close_session(&self) -> Result<()> {
        let peripheral = self.peripheral().await?;
        info!("Disconnecting from device...");
        peripheral.disconnect().await?;
        Ok(())
    }

    async fn read(&self, uuid: Uuid) -> Result<Vec<u8>> {
        let (peripheral, characteristic) = self.characteristic(uuid).await?;
        let data = timeout(self.config.read_timeout, peripheral.read(&characteristic))
            .await
            .map_err(|_| {
                Error::timeout(format!("read characteristic {}", uuid), self.config.read_timeout)
            })??;
        Ok(data)
    }

    async fn write(&self, uuid: Uuid, data: &[u8]) -> Result<()> {
        let (peripheral, characteristic) = self.characteristic(uuid).await?;
        timeout(
            self.config.write_timeout,
            peripheral.write(&characteristic, data, WriteType::WithResponse),
        )
        .await
        .map_err(|_| {
            Error::timeout(format!("write characteristic {}", uuid), self.config.write_timeout)
        })??;
        Ok(())
    }

    async fn notifications(&self, uuid: Uuid) -> Result<NotificationStream> {
        let (peripheral, characteristic) = self.characteristic(uuid).await?;
        peripheral.subscribe(&characteristic).await?;

        let stream = peripheral.notifications().await?;
        Ok(stream
            .filter_map(move |notification| async move {
                (notification.uuid == uuid).then_some(notification.value)
            })
            .boxed())
    }

    async fn drops(&self) -> Result<DropStream> {
        let adapter = self.adapter().await?;
        let target = self.peripheral().await?.id();

        let events = adapter.events().await?;
        Ok(events
            .filter_map(move |event| {
                let target = target.clone();
                async move {
                    match event {
                        CentralEvent::DeviceDisconnected(id) if id == target => Some(()),
                        _ => None,
                    }
                }
            })
            .boxed())
    }
}

impl BtleTransport {
    async fn select(&self, peripheral: Peripheral) {
        *self.selected.write().await = Some(Selected {
            peripheral,
            characteristics: HashMap::new(),
        });
    }
}
