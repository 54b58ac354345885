//! Mock transport for testing.
//!
//! This module provides a [`MockTransport`] that stands in for the BLE stack
//! so the link client, the session and the CLI can be exercised without
//! hardware.
//!
//! # Features
//!
//! - **Failure injection**: no adapter, cancelled selection, failed connects, failed writes
//! - **Peripheral simulation**: push call-signal notifications, simulate link drops
//! - **Inspection**: every write is recorded per characteristic

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::broadcast;
use uuid::Uuid;

use roomstatus_types::Channel;
use roomstatus_types::uuid::DEVICE_NAME;

use crate::error::{Capability, Error, Result};
use crate::traits::{DropStream, LinkTransport, NotificationStream, PeerInfo};

/// A mock peripheral and BLE stack.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use roomstatus_core::{LinkClient, MockTransport, NoopHandler};
/// use roomstatus_types::Channel;
///
/// #[tokio::main]
/// async fn main() {
///     let transport = Arc::new(MockTransport::new());
///     let link = LinkClient::new(Arc::clone(&transport), Arc::new(NoopHandler));
///     link.connect().await.unwrap();
///     link.write_channel(Channel::Content, "hello").await.unwrap();
///     assert_eq!(transport.writes_to(Channel::Content), vec!["hello".to_string()]);
/// }
/// ```
pub struct MockTransport {
    peer: PeerInfo,
    available: AtomicBool,
    cancel_selection: AtomicBool,
    select_count: AtomicU32,
    open: AtomicBool,
    open_count: AtomicU32,
    remaining_connect_failures: AtomicU32,
    fail_writes: AtomicBool,
    /// Simulated connect latency in milliseconds (0 = no delay).
    connect_latency_ms: AtomicU64,
    values: Mutex<HashMap<Uuid, Vec<u8>>>,
    writes: Mutex<Vec<(Uuid, Vec<u8>)>>,
    notify_tx: broadcast::Sender<(Uuid, Vec<u8>)>,
    drop_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("peer", &self.peer)
            .field("open", &self.open.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a mock peripheral advertising as `RoomStatusMonitor`.
    pub fn new() -> Self {
        let (notify_tx, _) = broadcast::channel(64);
        let (drop_tx, _) = broadcast::channel(16);
        Self {
            peer: PeerInfo {
                id: format!("MOCK-{:06X}", rand::random::<u32>() % 0xFFFFFF),
                name: Some(DEVICE_NAME.to_string()),
            },
            available: AtomicBool::new(true),
            cancel_selection: AtomicBool::new(false),
            select_count: AtomicU32::new(0),
            open: AtomicBool::new(false),
            open_count: AtomicU32::new(0),
            remaining_connect_failures: AtomicU32::new(0),
            fail_writes: AtomicBool::new(false),
            connect_latency_ms: AtomicU64::new(0),
            values: Mutex::new(HashMap::new()),
            writes: Mutex::new(Vec::new()),
            notify_tx,
            drop_tx,
        }
    }

    /// Identity the mock reports when selected.
    pub fn peer(&self) -> &PeerInfo {
        &self.peer
    }

    /// Simulate a host with or without a Bluetooth adapter.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    /// Simulate the user dismissing the device chooser.
    pub fn set_cancel_selection(&self, cancel: bool) {
        self.cancel_selection.store(cancel, Ordering::Relaxed);
    }

    /// Fail the next `count` session opens.
    pub fn fail_next_connects(&self, count: u32) {
        self.remaining_connect_failures
            .store(count, Ordering::Relaxed);
    }

    /// Make every write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Add artificial latency to session opens.
    pub fn set_connect_latency(&self, latency: Duration) {
        self.connect_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Number of times a device was selected.
    pub fn select_count(&self) -> u32 {
        self.select_count.load(Ordering::Relaxed)
    }

    /// Number of session-open attempts, failed ones included.
    pub fn open_count(&self) -> u32 {
        self.open_count.load(Ordering::Relaxed)
    }

    /// Set the value a characteristic returns on read.
    pub fn set_value(&self, channel: Channel, value: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(channel.uuid(), value.as_bytes().to_vec());
        }
    }

    /// Text written to a channel, oldest first.
    pub fn writes_to(&self, channel: Channel) -> Vec<String> {
        let uuid = channel.uuid();
        self.writes
            .lock()
            .map(|writes| {
                writes
                    .iter()
                    .filter(|(u, _)| *u == uuid)
                    .map(|(_, v)| String::from_utf8_lossy(v).into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Push a call-signal notification as the peripheral would.
    pub fn notify_call_signal(&self, text: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(Channel::CallSignal.uuid(), text.as_bytes().to_vec());
        }
        let _ = self
            .notify_tx
            .send((Channel::CallSignal.uuid(), text.as_bytes().to_vec()));
    }

    /// Simulate the peripheral going away.
    pub fn simulate_drop(&self) {
        self.open.store(false, Ordering::SeqCst);
        let _ = self.drop_tx.send(());
    }

    fn check_open(&self) -> Result<()> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }
}

#[async_trait]
impl LinkTransport for MockTransport {
    async fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(Error::CapabilityUnavailable(Capability::Bluetooth))
        }
    }

    async fn select_device(&self) -> Result<PeerInfo> {
        if self.cancel_selection.load(Ordering::Relaxed) {
            return Err(Error::NoDeviceSelected);
        }
        self.select_count.fetch_add(1, Ordering::Relaxed);
        Ok(self.peer.clone())
    }

    async fn open_session(&self) -> Result<()> {
        self.open_count.fetch_add(1, Ordering::Relaxed);

        let latency = self.connect_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.remaining_connect_failures.load(Ordering::Relaxed) > 0 {
            self.remaining_connect_failures
                .fetch_sub(1, Ordering::Relaxed);
            return Err(Error::connection_failed(
                Some(self.peer.id.clone()),
                "mock connect failure",
            ));
        }

        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn is_session_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn close_session(&self) -> Result<()> {
        self.open.store(false, Ordering::SeqCst);
        let _ = self.drop_tx.send(());
        Ok(())
    }

    async fn read(&self, uuid: Uuid) -> Result<Vec<u8>> {
        self.check_open()?;
        Ok(self
            .values
            .lock()
            .ok()
            .and_then(|values| values.get(&uuid).cloned())
            .unwrap_or_default())
    }

    async fn write(&self, uuid: Uuid, data: &[u8]) -> Result<()> {
        self.check_open()?;
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(Error::Io(std::io::Error::other("mock write failure")));
        }
        if let Ok(mut writes) = self.writes.lock() {
            writes.push((uuid, data.to_vec()));
        }
        if let Ok(mut values) = self.values.lock() {
            values.insert(uuid, data.to_vec());
        }
        Ok(())
    }

    async fn notifications(&self, uuid: Uuid) -> Result<NotificationStream> {
        self.check_open()?;
        let rx = self.notify_tx.subscribe();
        let stream = futures::stream::unfold(rx, move |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok((u, value)) if u == uuid => return Some((value, rx)),
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(stream.boxed())
    }

    async fn drops(&self) -> Result<DropStream> {
        let rx = self.drop_tx.subscribe();
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(()) => return Some(((), rx)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(stream.boxed())
    }
}
