//! Alert presenter: turns a signal into history, a tone and a prompt.
//!
//! For each [`SignalEvent`] the presenter records a history row, remembers
//! the signal time, plays the alert melody and then asks for a decision in
//! one of three ways, in order of preference:
//!
//! 1. a desktop notification through the [`Notifier`] (the foreground dialog
//!    is opened alongside it),
//! 2. the foreground dialog alone,
//! 3. a blocking [`Prompt`] confirmation.
//!
//! Only the last yields a decision directly; the others deliver it later
//! through the session.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use roomstatus_types::{Decision, NotificationRequest, SignalEvent, SignalKind};

use crate::error::Result;
use crate::history::History;
use crate::settings::GainSetting;
use crate::tone::TonePlayer;

/// Dispatches system notifications.
pub trait Notifier: Send + Sync {
    /// Whether notifications can be shown (support and permission).
    fn available(&self) -> bool;

    /// Request a notification.
    fn notify(&self, request: NotificationRequest) -> Result<()>;
}

/// The in-foreground decision dialog.
pub trait DialogHost: Send + Sync {
    /// Show the dialog for a signal kind. A dialog already open for the same
    /// kind is replaced.
    fn open(&self, kind: SignalKind);

    /// Close the dialog for a kind if it is open.
    fn close(&self, kind: SignalKind);
}

/// Blocking yes/no confirmation.
#[async_trait]
pub trait Prompt: Send + Sync {
    /// Ask the user; `true` means confirmed.
    async fn confirm(&self, message: &str) -> bool;
}

/// How a signal was surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    /// A notification was dispatched; the decision arrives through the relay
    /// or the dialog.
    Notified,
    /// The foreground dialog was opened.
    DialogOpened,
    /// The confirmation prompt produced a decision.
    Decided(Decision),
    /// The confirmation prompt was declined and the kind has no decline
    /// decision.
    Dismissed,
}

/// Presents signals to the user.
pub struct AlertPresenter {
    history: Arc<RwLock<History>>,
    tone: TonePlayer,
    gain: GainSetting,
    notifier: Option<Arc<dyn Notifier>>,
    dialog: Option<Arc<dyn DialogHost>>,
    prompt: Arc<dyn Prompt>,
    last_signal: RwLock<Option<OffsetDateTime>>,
}

impl std::fmt::Debug for AlertPresenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertPresenter")
            .field("tone", &self.tone)
            .field("has_notifier", &self.notifier.is_some())
            .field("has_dialog", &self.dialog.is_some())
            .finish_non_exhaustive()
    }
}

impl AlertPresenter {
    /// Create a presenter. The stored gain is applied to the tone player.
    pub fn new(
        history: Arc<RwLock<History>>,
        tone: TonePlayer,
        gain: GainSetting,
        prompt: Arc<dyn Prompt>,
    ) -> Self {
        tone.set_gain(gain.load());
        Self {
            history,
            tone,
            gain,
            notifier: None,
            dialog: None,
            prompt,
            last_signal: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[must_use]
    pub fn with_dialog(mut self, dialog: Arc<dyn DialogHost>) -> Self {
        self.dialog = Some(dialog);
        self
    }

    /// Open the audio output. Call from a direct user action.
    pub fn initialize_audio(&self) -> Result<()> {
        self.tone.initialize()
    }

    pub fn tone(&self) -> &TonePlayer {
        &self.tone
    }

    /// Time of the most recent signal.
    pub async fn last_signal(&self) -> Option<OffsetDateTime> {
        *self.last_signal.read().await
    }

    /// Current gain.
    pub fn gain(&self) -> f32 {
        self.tone.gain()
    }

    /// Apply a gain to the live tone and persist it.
    pub fn set_gain(&self, gain: f32) -> Result<()> {
        self.gain.save(gain)?;
        self.tone.set_gain(gain);
        info!(gain, "Gain updated");
        Ok(())
    }

    /// Close the foreground dialog for a kind.
    pub fn close_dialog(&self, kind: SignalKind) {
        if let Some(dialog) = &self.dialog {
            dialog.close(kind);
        }
    }

    /// Surface a signal.
    pub async fn on_signal(&self, event: SignalEvent) -> AlertOutcome {
        self.history.write().await.record(&event);
        *self.last_signal.write().await = Some(event.timestamp);
        debug!(kind = %event.kind, "Signal recorded");

        self.tone.play();

        let request = NotificationRequest::for_signal(event.kind);
        if let Some(notifier) = self.notifier.as_ref().filter(|n| n.available()) {
            match notifier.notify(request.clone()) {
                Ok(()) => {
                    if let Some(dialog) = &self.dialog {
                        dialog.open(event.kind);
                    }
                    return AlertOutcome::Notified;
                }
                Err(e) => warn!(error = %e, "Notification failed, falling back"),
            }
        }

        if let Some(dialog) = &self.dialog {
            dialog.open(event.kind);
            return AlertOutcome::DialogOpened;
        }

        let message = format!("{}: {}", request.title, request.options.body);
        let confirmed = self.prompt.confirm(&message).await;
        match (event.kind, confirmed) {
            (SignalKind::Call, true) => AlertOutcome::Decided(Decision::Ok),
            (SignalKind::Call, false) => AlertOutcome::Decided(Decision::Ng),
            (SignalKind::Yo, true) => AlertOutcome::Decided(Decision::YoOk),
            (SignalKind::Yo, false) => AlertOutcome::Dismissed,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::error::Error;
    use crate::settings::MemoryPreferences;
    use crate::tone::{AudioBackend, AudioOutput};

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

    #[derive(Default)]
    struct Notes {
        available: AtomicBool,
        fail: AtomicBool,
        sent: Mutex<Vec<NotificationRequest>>,
    }

    impl Notifier for Notes {
        fn available(&self) -> bool {
            self.available.load(Ordering::SeqCst)
        }

        fn notify(&self, request: NotificationRequest) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Closed("relay"));
            }
            self.sent.lock().unwrap().push(request);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Dialogs {
        opened: Mutex<Vec<SignalKind>>,
    }

    impl DialogHost for Dialogs {
        fn open(&self, kind: SignalKind) {
            self.opened.lock().unwrap().push(kind);
        }

        fn close(&self, _kind: SignalKind) {}
    }

    struct Answer(bool, Mutex<Vec<String>>);

    #[async_trait]
    impl Prompt for Answer {
        async fn confirm(&self, message: &str) -> bool {
            self.1.lock().unwrap().push(message.to_string());
            self.0
        }
    }

    fn make_presenter(answer: bool) -> (AlertPresenter, Arc<RwLock<History>>, Arc<Answer>) {
        let history = Arc::new(RwLock::new(History::new()));
        let prompt = Arc::new(Answer(answer, Mutex::new(Vec::new())));
        let presenter = AlertPresenter::new(
            Arc::clone(&history),
            TonePlayer::new(Box::new(Silent)),
            GainSetting::new(Arc::new(MemoryPreferences::new())),
            prompt.clone(),
        );
        (presenter, history, prompt)
    }

    #[tokio::test]
    async fn test_signal_records_one_unresolved_row() {
        for kind in [SignalKind::Call, SignalKind::Yo] {
            let (presenter, history, _) = make_presenter(true);
            let event = SignalEvent::now(kind);
            presenter.on_signal(event.clone()).await;

            let history = history.read().await;
            assert_eq!(history.len(), 1);
            assert_eq!(history.latest().unwrap().title, kind.title());
            assert!(history.latest().unwrap().response.is_none());
            assert_eq!(presenter.last_signal().await, Some(event.timestamp));
        }
    }

    #[tokio::test]
    async fn test_notification_dispatch_tagged_by_kind() {
        let (presenter, _, prompt) = make_presenter(true);
        let notes = Arc::new(Notes::default());
        notes.available.store(true, Ordering::SeqCst);
        let dialogs = Arc::new(Dialogs::default());
        let presenter = presenter
            .with_notifier(notes.clone())
            .with_dialog(dialogs.clone());

        assert_eq!(
            presenter.on_signal(SignalEvent::now(SignalKind::Call)).await,
            AlertOutcome::Notified
        );
        assert_eq!(
            presenter.on_signal(SignalEvent::now(SignalKind::Yo)).await,
            AlertOutcome::Notified
        );

        let sent = notes.sent.lock().unwrap();
        let tags: Vec<_> = sent.iter().map(|r| r.options.tag.as_str()).collect();
        assert_eq!(tags, vec!["call", "yo"]);
        assert_eq!(
            *dialogs.opened.lock().unwrap(),
            vec![SignalKind::Call, SignalKind::Yo]
        );
        assert!(prompt.1.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_notifier_falls_back_to_dialog() {
        let (presenter, _, _) = make_presenter(true);
        let dialogs = Arc::new(Dialogs::default());
        let presenter = presenter
            .with_notifier(Arc::new(Notes::default()))
            .with_dialog(dialogs.clone());

        assert_eq!(
            presenter.on_signal(SignalEvent::now(SignalKind::Call)).await,
            AlertOutcome::DialogOpened
        );
    }

    #[tokio::test]
    async fn test_failed_notification_falls_back_to_prompt() {
        let (presenter, _, prompt) = make_presenter(false);
        let notes = Arc::new(Notes::default());
        notes.available.store(true, Ordering::SeqCst);
        notes.fail.store(true, Ordering::SeqCst);
        let presenter = presenter.with_notifier(notes);

        assert_eq!(
            presenter.on_signal(SignalEvent::now(SignalKind::Call)).await,
            AlertOutcome::Decided(Decision::Ng)
        );
        assert_eq!(prompt.1.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_fallback_decisions() {
        let (presenter, _, prompt) = make_presenter(true);
        assert_eq!(
            presenter.on_signal(SignalEvent::now(SignalKind::Call)).await,
            AlertOutcome::Decided(Decision::Ok)
        );
        assert_eq!(
            presenter.on_signal(SignalEvent::now(SignalKind::Yo)).await,
            AlertOutcome::Decided(Decision::YoOk)
        );
        assert!(prompt.1.lock().unwrap()[0].starts_with("RoomStatusMonitor: "));

        let (presenter, _, _) = make_presenter(false);
        assert_eq!(
            presenter.on_signal(SignalEvent::now(SignalKind::Yo)).await,
            AlertOutcome::Dismissed
        );
    }

    #[tokio::test]
    async fn test_set_gain_persists_and_applies() {
        let prefs = Arc::new(MemoryPreferences::new());
        let presenter = AlertPresenter::new(
            Arc::new(RwLock::new(History::new())),
            TonePlayer::new(Box::new(Silent)),
            GainSetting::new(prefs.clone()),
            Arc::new(Answer(true, Mutex::new(Vec::new()))),
        );
        presenter.set_gain(0.3).unwrap();
        assert_eq!(presenter.gain(), 0.3);
        assert_eq!(GainSetting::new(prefs).load(), 0.3);
    }
}
