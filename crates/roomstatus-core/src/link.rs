//! Link client: pairing, session lifecycle and channel I/O.
//!
//! [`LinkClient`] owns the single connection to the peripheral. It pairs on
//! first use, subscribes to the call-signal channel on every connect, and
//! forwards classified signals and drops to a [`LinkHandler`].
//!
//! After an unexpected drop the client makes exactly one reconnect attempt
//! and re-sends the last status, unless [`LinkClient::disconnect`] has been
//! called. Nothing re-enables auto-reconnect once it is off.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use futures::StreamExt;
use futures::future::BoxFuture;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use roomstatus_types::{Channel, SignalEvent, SignalKind, decode_payload};

use crate::error::{Error, Result};
use crate::events::{DisconnectReason, EventDispatcher, EventReceiver, LinkEvent};
use crate::traits::{LinkHandler, LinkTransport, PeerInfo, ResponseWriter};

/// Snapshot of the connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Selected peer, once paired.
    pub peer: Option<PeerInfo>,
    /// Whether a session is open.
    pub connected: bool,
    /// Whether a drop triggers a reconnect.
    pub auto_reconnect: bool,
}

struct LinkInner<T: LinkTransport> {
    transport: Arc<T>,
    handler: Arc<dyn LinkHandler>,
    peer: RwLock<Option<PeerInfo>>,
    auto_reconnect: AtomicBool,
    /// Number of session-open attempts, including failed ones.
    connect_attempts: AtomicU32,
    last_status: RwLock<Option<String>>,
    /// Serializes pair/connect sequences.
    session_lock: Mutex<()>,
    signal_task: Mutex<Option<JoinHandle<()>>>,
    drop_task: Mutex<Option<JoinHandle<()>>>,
    events: EventDispatcher,
}

/// Client for the peripheral's GATT service.
///
/// Cloning is cheap; clones share the same connection.
pub struct LinkClient<T: LinkTransport> {
    inner: Arc<LinkInner<T>>,
}

impl<T: LinkTransport> Clone for LinkClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: LinkTransport> std::fmt::Debug for LinkClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkClient")
            .field(
                "auto_reconnect",
                &self.inner.auto_reconnect.load(Ordering::SeqCst),
            )
            .field(
                "connect_attempts",
                &self.inner.connect_attempts.load(Ordering::SeqCst),
            )
            .finish_non_exhaustive()
    }
}

impl<T: LinkTransport> LinkClient<T> {
    /// Create a client over a transport. Auto-reconnect starts enabled.
    pub fn new(transport: Arc<T>, handler: Arc<dyn LinkHandler>) -> Self {
        Self {
            inner: Arc::new(LinkInner {
                transport,
                handler,
                peer: RwLock::new(None),
                auto_reconnect: AtomicBool::new(true),
                connect_attempts: AtomicU32::new(0),
                last_status: RwLock::new(None),
                session_lock: Mutex::new(()),
                signal_task: Mutex::new(None),
                drop_task: Mutex::new(None),
                events: EventDispatcher::default(),
            }),
        }
    }

    fn from_inner(inner: Arc<LinkInner<T>>) -> Self {
        Self { inner }
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> EventReceiver {
        self.inner.events.subscribe()
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.inner.transport
    }

    /// Whether a drop will trigger a reconnect.
    pub fn auto_reconnect_enabled(&self) -> bool {
        self.inner.auto_reconnect.load(Ordering::SeqCst)
    }

    /// Number of session-open attempts so far.
    pub fn connect_attempts(&self) -> u32 {
        self.inner.connect_attempts.load(Ordering::SeqCst)
    }

    /// Last status written through [`LinkClient::set_status`].
    pub async fn last_status(&self) -> Option<String> {
        self.inner.last_status.read().await.clone()
    }

    /// Current connection state.
    pub async fn connection(&self) -> Connection {
        Connection {
            peer: self.inner.peer.read().await.clone(),
            connected: self.inner.transport.is_session_open().await,
            auto_reconnect: self.auto_reconnect_enabled(),
        }
    }

    /// Select the peripheral. Idempotent.
    ///
    /// On first success a drop listener is registered for the peer.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn pair(&self) -> Result<PeerInfo> {
        let _guard = self.inner.session_lock.lock().await;
        self.pair_locked().await
    }

    async fn pair_locked(&self) -> Result<PeerInfo> {
        if let Some(peer) = self.inner.peer.read().await.clone() {
            return Ok(peer);
        }

        self.inner.transport.check_available().await?;
        let peer = self.inner.transport.select_device().await?;
        info!(peer = %peer.display_name(), "Paired");

        *self.inner.peer.write().await = Some(peer.clone());
        self.spawn_drop_listener().await?;
        self.inner.events.send(LinkEvent::Paired {
            id: peer.id.clone(),
            name: peer.name.clone(),
        });
        Ok(peer)
    }

    /// Open a session on the paired peer and subscribe to call signals.
    ///
    /// Pairs first if needed. Returns immediately when already connected.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn connect(&self) -> Result<()> {
        let _guard = self.inner.session_lock.lock().await;
        let peer = self.pair_locked().await?;

        if self.inner.transport.is_session_open().await {
            debug!("Session already open");
            return Ok(());
        }

        self.inner.connect_attempts.fetch_add(1, Ordering::SeqCst);
        self.inner
            .transport
            .open_session()
            .await
            .map_err(|e| match e {
                e @ (Error::ConnectionFailed { .. } | Error::CapabilityUnavailable(_)) => e,
                other => Error::connection_failed(Some(peer.id.clone()), other.to_string()),
            })?;
        info!(peer = %peer.display_name(), "Connected");

        self.subscribe_signals().await?;
        self.inner
            .events
            .send(LinkEvent::Connected { id: peer.id.clone() });
        Ok(())
    }

    /// Tear down the session and disable auto-reconnect.
    ///
    /// Returns whether a session was actually closed.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn disconnect(&self) -> Result<bool> {
        self.inner.auto_reconnect.store(false, Ordering::SeqCst);

        let Some(peer) = self.inner.peer.read().await.clone() else {
            return Ok(false);
        };
        if !self.inner.transport.is_session_open().await {
            return Ok(false);
        }

        if let Some(handle) = self.inner.signal_task.lock().await.take() {
            handle.abort();
        }
        self.inner.transport.close_session().await?;
        info!(peer = %peer.display_name(), "Disconnected");
        self.inner.events.send(LinkEvent::Disconnected {
            id: peer.id,
            reason: DisconnectReason::UserRequested,
        });
        Ok(true)
    }

    /// Read a channel as text.
    pub async fn read_channel(&self, channel: Channel) -> Result<String> {
        self.ensure_session(channel).await?;
        let bytes = self
            .inner
            .transport
            .read(channel.uuid())
            .await
            .map_err(|e| Self::channel_error(channel, e))?;
        decode_payload(&bytes).map_err(|e| Error::channel(channel, e.to_string()))
    }

    /// Write text to a channel.
    pub async fn write_channel(&self, channel: Channel, value: &str) -> Result<()> {
        self.ensure_session(channel).await?;
        debug!(%channel, value, "Writing channel");
        self.inner
            .transport
            .write(channel.uuid(), value.as_bytes())
            .await
            .map_err(|e| Self::channel_error(channel, e))
    }

    /// Write the status channel and remember the value for resync.
    pub async fn set_status(&self, status: &str) -> Result<()> {
        if status.is_empty() {
            error!("invalid status: {:?}", status);
            return Err(Error::UnrecognizedInput("empty status".to_string()));
        }
        self.write_channel(Channel::Status, status).await?;
        *self.inner.last_status.write().await = Some(status.to_string());
        Ok(())
    }

    /// Seed the status re-sent after a reconnect, e.g. from saved config.
    ///
    /// Empty values are ignored. Does not write the channel.
    pub async fn remember_status(&self, status: &str) {
        if status.is_empty() {
            return;
        }
        *self.inner.last_status.write().await = Some(status.to_string());
    }

    async fn ensure_session(&self, channel: Channel) -> Result<()> {
        if !channel.is_read_write() {
            return Err(Error::channel(channel, "channel is notify-only"));
        }
        if !self.inner.transport.is_session_open().await {
            return Err(Error::channel(channel, "session not active"));
        }
        Ok(())
    }

    fn channel_error(channel: Channel, err: Error) -> Error {
        match err {
            e @ (Error::Timeout { .. } | Error::ChannelError { .. }) => e,
            other => Error::channel(channel, other.to_string()),
        }
    }

    async fn subscribe_signals(&self) -> Result<()> {
        let mut stream = self
            .inner
            .transport
            .notifications(Channel::CallSignal.uuid())
            .await?;
        let handler = Arc::clone(&self.inner.handler);

        let handle = tokio::spawn(async move {
            while let Some(value) = stream.next().await {
                debug!("size: {} bytes", value.len());
                let text = match decode_payload(&value) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "Dropping undecodable call signal");
                        continue;
                    }
                };
                match SignalKind::from_payload(&text) {
                    Some(kind) => handler.on_signal(SignalEvent::now(kind)),
                    None => debug!(value = %text, "Ignoring call signal"),
                }
            }
        });

        if let Some(old) = self.inner.signal_task.lock().await.replace(handle) {
            old.abort();
        }
        Ok(())
    }

    // Boxed: the listener reconnects through `pair_locked`, which spawns the
    // listener again, so the future type has to be named to be `Send`.
    fn spawn_drop_listener(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut drops = self.inner.transport.drops().await?;
            let weak: Weak<LinkInner<T>> = Arc::downgrade(&self.inner);

            let handle = tokio::spawn(async move {
                while drops.next().await.is_some() {
                    let Some(inner) = weak.upgrade() else {
                        break;
                    };
                    LinkClient::from_inner(inner).handle_drop().await;
                }
            });

            if let Some(old) = self.inner.drop_task.lock().await.replace(handle) {
                old.abort();
            }
            Ok(())
        })
    }

    async fn handle_drop(&self) {
        let peer = self.inner.peer.read().await.clone();
        let (id, name) = peer
            .map(|p| (p.id.clone(), p.display_name().to_string()))
            .unwrap_or_default();

        // A drop after `disconnect()` is the teardown the caller asked for.
        if !self.auto_reconnect_enabled() {
            info!("Device {} is disconnected.", name);
            return;
        }

        self.inner.handler.on_drop();

        self.inner.events.send(LinkEvent::Disconnected {
            id: id.clone(),
            reason: DisconnectReason::Unexpected,
        });
        info!("Device {} is disconnected. Reconnect...", name);
        self.inner
            .events
            .send(LinkEvent::ReconnectStarted { id: id.clone() });

        match self.reconnect_and_resync().await {
            Ok(()) => {
                self.inner
                    .events
                    .send(LinkEvent::ReconnectSucceeded { id });
            }
            Err(e) => {
                error!(error = %e, "Something went wrong while reconnecting");
                self.inner.events.send(LinkEvent::ReconnectFailed {
                    id,
                    error: e.to_string(),
                });
            }
        }
    }

    async fn reconnect_and_resync(&self) -> Result<()> {
        self.connect().await?;
        if let Some(status) = self.last_status().await {
            self.write_channel(Channel::Status, &status).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<T: LinkTransport> ResponseWriter for LinkClient<T> {
    async fn write_response(&self, text: &str) -> Result<()> {
        self.write_channel(Channel::Content, text).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use super::*;
    use crate::mock::MockTransport;

    #[derive(Default)]
    struct Recorder {
        signals: StdMutex<Vec<SignalKind>>,
        drops: AtomicU32,
    }

    impl LinkHandler for Recorder {
        fn on_signal(&self, event: SignalEvent) {
            self.signals.lock().unwrap().push(event.kind);
        }

        fn on_drop(&self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn client() -> (LinkClient<MockTransport>, Arc<MockTransport>, Arc<Recorder>) {
        let transport = Arc::new(MockTransport::new());
        let recorder = Arc::new(Recorder::default());
        let handler: Arc<dyn LinkHandler> = recorder.clone();
        (
            LinkClient::new(Arc::clone(&transport), handler),
            transport,
            recorder,
        )
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_pair_is_idempotent() {
        let (link, transport, _) = client();
        let first = link.pair().await.unwrap();
        let second = link.pair().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(transport.select_count(), 1);
    }

    #[tokio::test]
    async fn test_pair_without_adapter() {
        let (link, transport, _) = client();
        transport.set_available(false);
        let err = link.pair().await.unwrap_err();
        assert!(matches!(
            err,
            Error::CapabilityUnavailable(crate::error::Capability::Bluetooth)
        ));
    }

    #[tokio::test]
    async fn test_pair_cancelled() {
        let (link, transport, _) = client();
        transport.set_cancel_selection(true);
        assert!(matches!(
            link.pair().await.unwrap_err(),
            Error::NoDeviceSelected
        ));
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let (link, _, _) = client();
        link.connect().await.unwrap();
        link.connect().await.unwrap();
        assert_eq!(link.connect_attempts(), 1);
        assert!(link.connection().await.connected);
    }

    #[tokio::test]
    async fn test_connect_failure_maps_to_connection_failed() {
        let (link, transport, _) = client();
        transport.fail_next_connects(1);
        let err = link.connect().await.unwrap_err();
        assert!(matches!(err, Error::ConnectionFailed { .. }));
    }

    #[tokio::test]
    async fn test_signals_are_classified() {
        let (link, transport, recorder) = client();
        link.connect().await.unwrap();

        transport.notify_call_signal("calling");
        transport.notify_call_signal("none");
        transport.notify_call_signal("yo");
        transport.notify_call_signal("garbage");
        settle().await;

        assert_eq!(
            *recorder.signals.lock().unwrap(),
            vec![SignalKind::Call, SignalKind::Yo]
        );
    }

    #[tokio::test]
    async fn test_channel_io_requires_session() {
        let (link, _, _) = client();
        let err = link.write_channel(Channel::Content, "hi").await.unwrap_err();
        assert!(matches!(err, Error::ChannelError { channel: Channel::Content, .. }));

        let err = link.read_channel(Channel::Status).await.unwrap_err();
        assert!(matches!(err, Error::ChannelError { channel: Channel::Status, .. }));
    }

    #[tokio::test]
    async fn test_call_signal_channel_is_notify_only() {
        let (link, _, _) = client();
        link.connect().await.unwrap();
        let err = link.read_channel(Channel::CallSignal).await.unwrap_err();
        assert!(matches!(err, Error::ChannelError { channel: Channel::CallSignal, .. }));
    }

    #[tokio::test]
    async fn test_write_and_read_round_trip_as_utf8() {
        let (link, transport, _) = client();
        link.connect().await.unwrap();
        link.write_channel(Channel::Content, "確認しました").await.unwrap();
        assert_eq!(
            transport.writes_to(Channel::Content),
            vec!["確認しました".to_string()]
        );
        assert_eq!(link.read_channel(Channel::Content).await.unwrap(), "確認しました");
    }

    #[tokio::test]
    async fn test_set_status_rejects_empty() {
        let (link, _, _) = client();
        link.connect().await.unwrap();
        assert!(matches!(
            link.set_status("").await.unwrap_err(),
            Error::UnrecognizedInput(_)
        ));
        assert_eq!(link.last_status().await, None);
    }

    #[tokio::test]
    async fn test_failed_status_write_is_not_resynced() {
        let (link, transport, _) = client();
        link.connect().await.unwrap();
        link.set_status("在室").await.unwrap();

        transport.set_fail_writes(true);
        assert!(link.set_status("不在").await.is_err());
        assert_eq!(link.last_status().await.as_deref(), Some("在室"));

        transport.set_fail_writes(false);
        transport.simulate_drop();
        settle().await;

        assert_eq!(
            transport.writes_to(Channel::Status).last().map(String::as_str),
            Some("在室")
        );
    }

    #[tokio::test]
    async fn test_remembered_status_is_resynced_after_drop() {
        let (link, transport, _) = client();
        link.remember_status("").await;
        assert_eq!(link.last_status().await, None);

        link.remember_status("会議中").await;
        link.connect().await.unwrap();
        assert!(transport.writes_to(Channel::Status).is_empty());

        transport.simulate_drop();
        settle().await;

        assert_eq!(transport.writes_to(Channel::Status), vec!["会議中".to_string()]);
    }

    #[tokio::test]
    async fn test_disconnect_reports_teardown() {
        let (link, _, _) = client();
        assert!(!link.disconnect().await.unwrap());

        let (link, _, _) = client();
        link.connect().await.unwrap();
        assert!(link.disconnect().await.unwrap());
        assert!(!link.disconnect().await.unwrap());
        assert!(!link.auto_reconnect_enabled());
    }

    #[tokio::test]
    async fn test_unexpected_drop_reconnects_once_and_resyncs_status() {
        let (link, transport, recorder) = client();
        link.connect().await.unwrap();
        link.set_status("在室").await.unwrap();
        let mut events = link.subscribe();

        transport.simulate_drop();
        settle().await;

        assert_eq!(recorder.drops.load(Ordering::SeqCst), 1);
        assert_eq!(link.connect_attempts(), 2);
        assert_eq!(
            transport.writes_to(Channel::Status),
            vec!["在室".to_string(), "在室".to_string()]
        );

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert!(seen.iter().any(|e| matches!(e, LinkEvent::ReconnectSucceeded { .. })));
    }

    #[tokio::test]
    async fn test_failed_reconnect_is_not_retried() {
        let (link, transport, _) = client();
        link.connect().await.unwrap();
        transport.fail_next_connects(5);

        transport.simulate_drop();
        settle().await;

        assert_eq!(link.connect_attempts(), 2);
        assert!(!link.connection().await.connected);
    }

    #[tokio::test]
    async fn test_no_reconnect_after_disconnect() {
        let (link, transport, recorder) = client();
        link.connect().await.unwrap();

        link.disconnect().await.unwrap();
        transport.simulate_drop();
        settle().await;

        assert_eq!(recorder.drops.load(Ordering::SeqCst), 0);
        assert_eq!(link.connect_attempts(), 1);
        assert!(!link.auto_reconnect_enabled());
    }

    #[tokio::test]
    async fn test_response_writer_targets_content() {
        let (link, transport, _) = client();
        link.connect().await.unwrap();
        link.write_response("OK").await.unwrap();
        assert_eq!(transport.writes_to(Channel::Content), vec!["OK".to_string()]);
        assert!(transport.writes_to(Channel::Status).is_empty());
    }
}
