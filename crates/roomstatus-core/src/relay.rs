//! Background notification relay.
//!
//! The relay is an actor on its own task. It shows [`NotificationRequest`]s
//! through a [`NotificationBackend`], turns the user's interaction with a
//! notification into a decision token, and posts it as a [`RelayReply`] to
//! the first live foreground client. With no client registered it asks a
//! [`ClientOpener`] for a new one.
//!
//! Everything crosses the task boundary as a message; the relay shares no
//! state with the foreground session.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use roomstatus_types::{Decision, NotificationRequest, RelayReply, SignalKind};

use crate::alert::Notifier;
use crate::error::{Error, Result};

/// A user's interaction with a shown notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    /// Tag of the notification (`"call"` or `"yo"`).
    pub tag: String,
    /// Action button pressed, or empty for a click on the body or a dismissal.
    pub action: String,
    /// Number of action buttons the notification offered.
    pub action_count: usize,
}

impl Interaction {
    pub fn new(tag: impl Into<String>, action: impl Into<String>, action_count: usize) -> Self {
        Self {
            tag: tag.into(),
            action: action.into(),
            action_count,
        }
    }
}

/// Where backends report interactions.
pub type InteractionSender = mpsc::UnboundedSender<Interaction>;

/// Shows notifications on the host.
pub trait NotificationBackend: Send + Sync + 'static {
    /// Whether notifications are supported and permitted.
    fn available(&self) -> bool;

    /// Show a notification. A notification with the same tag replaces the
    /// previous one. Interactions are reported on `interactions`, which is
    /// closed once the notification is replaced.
    fn show(&self, request: &NotificationRequest, interactions: InteractionSender) -> Result<()>;
}

/// A foreground client the relay can post to.
pub trait RelayClient: Send + Sync {
    /// Whether the client can still receive messages.
    fn is_alive(&self) -> bool;

    /// Deliver a reply.
    fn post(&self, reply: RelayReply) -> Result<()>;

    /// Bring the client to the front.
    fn focus(&self);
}

/// Creates a foreground client when none is running.
pub trait ClientOpener: Send + Sync {
    fn open_client(&self) -> Result<Arc<dyn RelayClient>>;
}

/// [`RelayClient`] backed by an mpsc channel.
pub struct ChannelClient {
    tx: mpsc::UnboundedSender<RelayReply>,
    focus: Option<Box<dyn Fn() + Send + Sync>>,
    focused: AtomicBool,
}

impl std::fmt::Debug for ChannelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelClient")
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}

impl ChannelClient {
    /// Create a client and the receiver its replies arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RelayReply>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                focus: None,
                focused: AtomicBool::new(false),
            },
            rx,
        )
    }

    /// Run `hook` whenever the relay focuses this client.
    #[must_use]
    pub fn on_focus(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.focus = Some(Box::new(hook));
        self
    }

    /// Whether the client has been focused at least once.
    pub fn was_focused(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }
}

impl RelayClient for ChannelClient {
    fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }

    fn post(&self, reply: RelayReply) -> Result<()> {
        self.tx
            .send(reply)
            .map_err(|_| Error::Closed("foreground client"))
    }

    fn focus(&self) {
        self.focused.store(true, Ordering::SeqCst);
        if let Some(hook) = &self.focus {
            hook();
        }
    }
}

/// Decide which token to relay for an interaction, if any.
///
/// - any interaction with a yo relays `yo_ok`, body clicks included;
/// - an empty action on a notification offering several actions is a dismissal;
/// - an empty action on a call relays nothing.
pub fn decide_action(interaction: &Interaction) -> Option<String> {
    match SignalKind::from_tag(&interaction.tag) {
        Some(SignalKind::Yo) => Some(Decision::YoOk.token().to_string()),
        _ if interaction.action.is_empty() && interaction.action_count > 1 => None,
        Some(SignalKind::Call) if interaction.action.is_empty() => None,
        _ => Some(interaction.action.clone()),
    }
}

enum RelayMessage {
    Show(NotificationRequest),
    Register(Arc<dyn RelayClient>),
    Interaction(Interaction),
}

/// Handle to a running relay.
#[derive(Clone)]
pub struct RelayHandle {
    tx: mpsc::UnboundedSender<RelayMessage>,
    available: bool,
}

impl std::fmt::Debug for RelayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayHandle")
            .field("available", &self.available)
            .finish_non_exhaustive()
    }
}

impl RelayHandle {
    /// Register a foreground client. Earlier clients take precedence.
    pub fn register(&self, client: Arc<dyn RelayClient>) -> Result<()> {
        self.tx
            .send(RelayMessage::Register(client))
            .map_err(|_| Error::Closed("relay"))
    }

    /// Report an interaction, as a backend would.
    pub fn report(&self, interaction: Interaction) -> Result<()> {
        self.tx
            .send(RelayMessage::Interaction(interaction))
            .map_err(|_| Error::Closed("relay"))
    }
}

impl Notifier for RelayHandle {
    fn available(&self) -> bool {
        self.available
    }

    fn notify(&self, request: NotificationRequest) -> Result<()> {
        self.tx
            .send(RelayMessage::Show(request))
            .map_err(|_| Error::Closed("relay"))
    }
}

/// The relay actor.
pub struct NotificationRelay {
    backend: Arc<dyn NotificationBackend>,
    opener: Option<Arc<dyn ClientOpener>>,
    clients: Vec<Arc<dyn RelayClient>>,
    /// Per-tag forwarder for the notification currently shown.
    shown: HashMap<String, JoinHandle<()>>,
}

impl NotificationRelay {
    pub fn new(backend: Arc<dyn NotificationBackend>) -> Self {
        Self {
            backend,
            opener: None,
            clients: Vec::new(),
            shown: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_opener(mut self, opener: Arc<dyn ClientOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    /// Start the actor. It stops once every [`RelayHandle`] is dropped.
    pub fn spawn(self) -> (RelayHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = RelayHandle {
            tx,
            available: self.backend.available(),
        };
        let task = tokio::spawn(self.run(rx));
        (handle, task)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<RelayMessage>) {
        let (interaction_tx, mut interaction_rx) = mpsc::unbounded_channel();
        info!("Notification relay started");

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else {
                        break;
                    };
                    match msg {
                        RelayMessage::Show(request) => self.show(&request, &interaction_tx),
                        RelayMessage::Register(client) => self.clients.push(client),
                        RelayMessage::Interaction(interaction) => self.on_interaction(interaction),
                    }
                }
                Some(interaction) = interaction_rx.recv() => {
                    self.on_interaction(interaction);
                }
            }
        }

        for (_, forwarder) in self.shown.drain() {
            forwarder.abort();
        }
        info!("Notification relay stopped");
    }

    /// Show `request` on its own interaction channel. Replacing a tag stops
    /// the previous forwarder, so a click seen by a stale waiter is dropped.
    fn show(&mut self, request: &NotificationRequest, sink: &InteractionSender) {
        let tag = request.options.tag.clone();
        debug!(tag = %tag, "Showing notification");

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Err(e) = self.backend.show(request, tx) {
            error!(error = %e, "Failed to show notification");
            return;
        }

        let sink = sink.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(interaction) = rx.recv().await {
                if sink.send(interaction).is_err() {
                    break;
                }
            }
        });
        if let Some(old) = self.shown.insert(tag, forwarder) {
            old.abort();
        }
    }

    fn on_interaction(&mut self, interaction: Interaction) {
        info!("action: {:?}", interaction.action);
        let Some(action) = decide_action(&interaction) else {
            debug!(tag = %interaction.tag, "Nothing to relay");
            return;
        };
        self.deliver(action);
    }

    fn deliver(&mut self, action: String) {
        self.clients.retain(|c| c.is_alive());

        if let Some(client) = self.clients.first() {
            match client.post(RelayReply::new(action.clone())) {
                Ok(()) => {
                    if action != Decision::Ng.token() {
                        client.focus();
                    }
                    return;
                }
                Err(e) => warn!(error = %e, "Failed to post to client"),
            }
        }

        let Some(opener) = &self.opener else {
            warn!(action = %action, "No foreground client to relay to");
            return;
        };
        match opener.open_client() {
            Ok(client) => {
                if let Err(e) = client.post(RelayReply::new(action)) {
                    error!(error = %e, "Failed to post to new client");
                }
                self.clients.push(client);
            }
            Err(e) => error!(error = %e, "Failed to open a foreground client"),
        }
    }
}
