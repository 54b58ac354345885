//! Session: the composition root that wires the link, the alert presenter,
//! the response router and the notification relay together.
//!
//! The session runs as one task. It owns every component and receives work
//! from five sources with `tokio::select!`:
//!
//! - front-end [`Command`]s,
//! - signals and drops forwarded by the link's [`LinkHandler`],
//! - reconnect outcomes broadcast as [`LinkEvent`]s,
//! - [`RelayReply`]s posted by the notification relay,
//! - the cancellation token.
//!
//! Results go back to the front end as [`SessionEvent`]s.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use roomstatus_types::{Channel, Decision, MessageSettings, RelayReply, SignalEvent};

use crate::alert::{AlertOutcome, AlertPresenter, DialogHost, Prompt};
use crate::error::{Error, Result};
use crate::events::{EventReceiver, LinkEvent};
use crate::history::History;
use crate::link::LinkClient;
use crate::messages::{Command, SessionEvent};
use crate::relay::{ChannelClient, RelayHandle};
use crate::router::ResponseRouter;
use crate::settings::GainSetting;
use crate::tone::{AudioBackend, TonePlayer};
use crate::traits::{LinkHandler, LinkTransport, PreferenceStore};

/// Default capacity of the command and event channels.
const CHANNEL_CAPACITY: usize = 32;

enum LinkSignal {
    Signal(SignalEvent),
    Dropped,
}

/// [`LinkHandler`] that forwards into the session task.
struct Forwarder {
    tx: mpsc::UnboundedSender<LinkSignal>,
}

impl LinkHandler for Forwarder {
    fn on_signal(&self, event: SignalEvent) {
        if self.tx.send(LinkSignal::Signal(event)).is_err() {
            debug!("Session gone, dropping signal");
        }
    }

    fn on_drop(&self) {
        let _ = self.tx.send(LinkSignal::Dropped);
    }
}

/// [`LinkHandler`] that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl LinkHandler for NoopHandler {
    fn on_signal(&self, _event: SignalEvent) {}

    fn on_drop(&self) {}
}

/// Builder for a [`Session`].
pub struct SessionBuilder<T: LinkTransport> {
    transport: Arc<T>,
    preferences: Arc<dyn PreferenceStore>,
    audio: Box<dyn AudioBackend>,
    prompt: Arc<dyn Prompt>,
    dialog: Option<Arc<dyn DialogHost>>,
    relay: Option<RelayHandle>,
    messages: MessageSettings,
    history_limit: usize,
    resync_status: Option<String>,
}

impl<T: LinkTransport> SessionBuilder<T> {
    pub fn new(
        transport: Arc<T>,
        preferences: Arc<dyn PreferenceStore>,
        audio: Box<dyn AudioBackend>,
        prompt: Arc<dyn Prompt>,
    ) -> Self {
        Self {
            transport,
            preferences,
            audio,
            prompt,
            dialog: None,
            relay: None,
            messages: MessageSettings::default(),
            history_limit: 0,
            resync_status: None,
        }
    }

    /// Attach the in-foreground dialog.
    #[must_use]
    pub fn dialog(mut self, dialog: Arc<dyn DialogHost>) -> Self {
        self.dialog = Some(dialog);
        self
    }

    /// Route notifications through a running relay.
    #[must_use]
    pub fn relay(mut self, relay: RelayHandle) -> Self {
        self.relay = Some(relay);
        self
    }

    #[must_use]
    pub fn messages(mut self, messages: MessageSettings) -> Self {
        self.messages = messages;
        self
    }

    /// Maximum history rows; 0 keeps everything.
    #[must_use]
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Status to re-send after a reconnect until one is set in this session.
    #[must_use]
    pub fn resync_status(mut self, status: Option<String>) -> Self {
        self.resync_status = status.filter(|s| !s.is_empty());
        self
    }

    /// Assemble the session.
    ///
    /// Registers the session as the relay's foreground client. Returns the
    /// session, a handle for sending commands and the event receiver.
    pub fn build(self) -> Result<(Session<T>, SessionHandle, mpsc::Receiver<SessionEvent>)> {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let link = LinkClient::new(self.transport, Arc::new(Forwarder { tx: signal_tx }));
        let link_events = link.subscribe();

        let history = Arc::new(RwLock::new(History::with_limit(self.history_limit)));

        let mut presenter = AlertPresenter::new(
            Arc::clone(&history),
            TonePlayer::new(self.audio),
            GainSetting::new(self.preferences),
            self.prompt,
        );
        if let Some(dialog) = self.dialog {
            presenter = presenter.with_dialog(dialog);
        }

        let reply_rx = match self.relay {
            Some(relay) => {
                let (client, rx) = ChannelClient::new();
                relay.register(Arc::new(client))?;
                presenter = presenter.with_notifier(Arc::new(relay));
                Some(rx)
            }
            None => None,
        };

        let router = ResponseRouter::new(
            Arc::clone(&history),
            self.messages,
            Arc::new(link.clone()),
        );

        let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let handle = SessionHandle {
            commands: command_tx,
            history: Arc::clone(&history),
            cancel: cancel.clone(),
        };
        let session = Session {
            link,
            presenter,
            router,
            history,
            signal_rx,
            link_events,
            resync_status: self.resync_status,
            reply_rx,
            command_rx,
            event_tx,
            cancel,
        };
        Ok((session, handle, event_rx))
    }
}

/// Front-end handle to a running [`Session`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    history: Arc<RwLock<History>>,
    cancel: CancellationToken,
}

impl SessionHandle {
    /// Send a command.
    pub async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::Closed("session"))
    }

    /// Shared history log.
    pub fn history(&self) -> &Arc<RwLock<History>> {
        &self.history
    }

    /// Stop the session loop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Token cancelled when the session should stop.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// The foreground session.
pub struct Session<T: LinkTransport> {
    link: LinkClient<T>,
    presenter: AlertPresenter,
    router: ResponseRouter,
    history: Arc<RwLock<History>>,
    signal_rx: mpsc::UnboundedReceiver<LinkSignal>,
    link_events: EventReceiver,
    resync_status: Option<String>,
    reply_rx: Option<mpsc::UnboundedReceiver<RelayReply>>,
    command_rx: mpsc::Receiver<Command>,
    event_tx: mpsc::Sender<SessionEvent>,
    cancel: CancellationToken,
}

impl<T: LinkTransport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("link", &self.link)
            .field("presenter", &self.presenter)
            .finish_non_exhaustive()
    }
}

async fn next_reply(rx: &mut Option<mpsc::UnboundedReceiver<RelayReply>>) -> Option<RelayReply> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

impl<T: LinkTransport> Session<T> {
    /// The link client.
    pub fn link(&self) -> &LinkClient<T> {
        &self.link
    }

    pub fn presenter(&self) -> &AlertPresenter {
        &self.presenter
    }

    pub fn router(&self) -> &ResponseRouter {
        &self.router
    }

    pub fn history(&self) -> &Arc<RwLock<History>> {
        &self.history
    }

    /// Run until cancelled, shut down, or every [`SessionHandle`] is dropped.
    ///
    /// Disconnects on exit.
    pub async fn run(mut self) {
        info!("Session started");
        if let Some(status) = self.resync_status.take() {
            self.link.remember_status(&status).await;
        }

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Session cancelled");
                    break;
                }
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(Command::Shutdown) => {
                            info!("Session received shutdown command");
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            info!("Command channel closed, shutting down session");
                            break;
                        }
                    }
                }
                Some(signal) = self.signal_rx.recv() => {
                    self.handle_link_signal(signal).await;
                }
                event = self.link_events.recv() => match event {
                    Ok(event) => self.handle_link_event(event).await,
                    Err(RecvError::Lagged(n)) => warn!(skipped = n, "Link events lagged"),
                    Err(RecvError::Closed) => {}
                },
                Some(reply) = next_reply(&mut self.reply_rx) => {
                    debug!(action = %reply.action, "Relay reply");
                    self.resolve_token(&reply.action).await;
                }
            }
        }

        if let Err(e) = self.link.disconnect().await {
            warn!(error = %e, "Disconnect on shutdown failed");
        }
        info!("Session stopped");
    }

    async fn handle_command(&mut self, cmd: Command) {
        debug!(?cmd, "Handling command");

        match cmd {
            Command::Connect => {
                self.initialize_audio();
                match self.connect_and_read().await {
                    Ok(status) => self.send_event(SessionEvent::Status(status)).await,
                    Err(e) => self.report("connect", e).await,
                }
            }
            Command::Disconnect => match self.link.disconnect().await {
                Ok(closed) => self.send_event(SessionEvent::Disconnected { closed }).await,
                Err(e) => self.report("disconnect", e).await,
            },
            Command::SetStatus(status) => {
                self.initialize_audio();
                let result = match self.connect().await {
                    Ok(()) => self.link.set_status(&status).await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(()) => self.send_event(SessionEvent::Status(status)).await,
                    Err(e) => self.report("set status", e).await,
                }
            }
            Command::ReadStatus => match self.connect_and_read().await {
                Ok(status) => self.send_event(SessionEvent::Status(status)).await,
                Err(e) => self.report("read status", e).await,
            },
            Command::Decide(decision) => self.decide(decision).await,
            Command::SetGain(gain) => match self.presenter.set_gain(gain) {
                Ok(()) => self.send_event(SessionEvent::GainChanged(gain)).await,
                Err(e) => self.report("set gain", e).await,
            },
            Command::SetMessages(messages) => self.router.set_messages(messages).await,
            Command::Shutdown => {}
        }
    }

    fn initialize_audio(&self) {
        if let Err(e) = self.presenter.initialize_audio() {
            warn!(error = %e, "Audio output unavailable");
        }
    }

    async fn connect(&self) -> Result<()> {
        let was_open = self.link.connection().await.connected;
        self.link.connect().await?;
        if !was_open && let Some(peer) = self.link.connection().await.peer {
            self.send_event(SessionEvent::Connected { peer }).await;
        }
        Ok(())
    }

    async fn connect_and_read(&self) -> Result<String> {
        self.connect().await?;
        self.link.read_channel(Channel::Status).await
    }

    async fn handle_link_signal(&mut self, signal: LinkSignal) {
        match signal {
            LinkSignal::Signal(event) => {
                let kind = event.kind;
                let outcome = self.presenter.on_signal(event).await;
                self.send_event(SessionEvent::Alerted { kind, outcome }).await;
                if let AlertOutcome::Decided(decision) = outcome {
                    self.decide(decision).await;
                }
            }
            LinkSignal::Dropped => self.send_event(SessionEvent::LinkDropped).await,
        }
    }

    async fn handle_link_event(&self, event: LinkEvent) {
        match event {
            LinkEvent::ReconnectSucceeded { .. } => {
                self.send_event(SessionEvent::Reconnected).await;
            }
            LinkEvent::ReconnectFailed { error, .. } => {
                self.send_event(SessionEvent::ReconnectFailed { message: error })
                    .await;
            }
            other => debug!(?other, "Link event"),
        }
    }

    async fn resolve_token(&self, token: &str) {
        match token.parse::<Decision>() {
            Ok(decision) => self.decide(decision).await,
            Err(_) => {
                if let Err(e) = self.router.resolve(token).await {
                    debug!(error = %e, "Ignored relay reply");
                }
            }
        }
    }

    async fn decide(&self, decision: Decision) {
        self.presenter.close_dialog(decision.signal_kind());
        match self.router.resolve_decision(decision).await {
            Ok(response) => {
                self.send_event(SessionEvent::Responded { decision, response })
                    .await;
            }
            Err(e) => self.report("write response", e).await,
        }
    }

    async fn report(&self, context: &str, err: Error) {
        error!("Something went wrong while trying to {}: {}", context, err);
        self.send_event(SessionEvent::Error {
            context: context.to_string(),
            message: err.to_string(),
            user_facing: err.is_user_facing(),
        })
        .await;
    }

    async fn send_event(&self, event: SessionEvent) {
        if self.event_tx.send(event).await.is_err() {
            debug!("Event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::mock::MockTransport;
    use crate::settings::MemoryPreferences;
    use crate::tone::AudioOutput;

    struct Silent;

    impl AudioOutput for Silent {
        fn play(&mut self, _samples: Vec<f32>, _sample_rate: u32) -> Result<()> {
            Ok(())
        }
    }

    impl AudioBackend for Silent {
        fn open(&self) -> Result<Box<dyn AudioOutput>> {
            Ok(Box::new(Silent))
        }
    }

    struct Decline;

    #[async_trait]
    impl Prompt for Decline {
        async fn confirm(&self, _message: &str) -> bool {
            false
        }
    }

    async fn next_event(rx: &mut mpsc::Receiver<SessionEvent>) -> SessionEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_connect_reads_status() {
        let transport = Arc::new(MockTransport::new());
        transport.set_value(Channel::Status, "在室");
        let (session, handle, mut events) = SessionBuilder::new(
            Arc::clone(&transport),
            Arc::new(MemoryPreferences::new()),
            Box::new(Silent),
            Arc::new(Decline),
        )
        .build()
        .unwrap();
        let task = tokio::spawn(session.run());

        handle.send(Command::Connect).await.unwrap();
        assert!(matches!(next_event(&mut events).await, SessionEvent::Connected { .. }));
        assert_eq!(next_event(&mut events).await, SessionEvent::Status("在室".into()));

        handle.shutdown();
        task.await.unwrap();
        assert!(!transport.is_session_open().await);
    }

    #[tokio::test]
    async fn test_unknown_decision_from_relay_is_ignored() {
        let transport = Arc::new(MockTransport::new());
        let (session, handle, _events) = SessionBuilder::new(
            Arc::clone(&transport),
            Arc::new(MemoryPreferences::new()),
            Box::new(Silent),
            Arc::new(Decline),
        )
        .build()
        .unwrap();
        session.link().connect().await.unwrap();
        session.resolve_token("maybe").await;

        assert!(transport.writes_to(Channel::Content).is_empty());
        drop(handle);
    }

    #[tokio::test]
    async fn test_dropping_handles_stops_session() {
        let (session, handle, _events) = SessionBuilder::new(
            Arc::new(MockTransport::new()),
            Arc::new(MemoryPreferences::new()),
            Box::new(Silent),
            Arc::new(Decline),
        )
        .build()
        .unwrap();
        let task = tokio::spawn(session.run());
        drop(handle);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
