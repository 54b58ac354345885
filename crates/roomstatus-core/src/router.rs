//! Response router: maps a decision to a canned response and writes it back.
//!
//! Decisions from the foreground dialog, the notification relay and the
//! confirm fallback all end up in [`ResponseRouter::resolve`], so they have
//! identical effects.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info};

use roomstatus_types::{Decision, MessageSettings};

use crate::error::{Error, Result};
use crate::history::History;
use crate::traits::ResponseWriter;

/// Resolves decision tokens into response writes.
pub struct ResponseRouter {
    history: Arc<RwLock<History>>,
    messages: RwLock<MessageSettings>,
    writer: Arc<dyn ResponseWriter>,
}

impl std::fmt::Debug for ResponseRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseRouter").finish_non_exhaustive()
    }
}

impl ResponseRouter {
    pub fn new(
        history: Arc<RwLock<History>>,
        messages: MessageSettings,
        writer: Arc<dyn ResponseWriter>,
    ) -> Self {
        Self {
            history,
            messages: RwLock::new(messages),
            writer,
        }
    }

    /// Current response strings.
    pub async fn messages(&self) -> MessageSettings {
        self.messages.read().await.clone()
    }

    /// Replace the response strings.
    pub async fn set_messages(&self, messages: MessageSettings) {
        *self.messages.write().await = messages;
    }

    /// Resolve a decision token (`"ok"`, `"ng"` or `"yo_ok"`).
    ///
    /// Unknown tokens are logged and rejected with
    /// [`Error::UnrecognizedInput`] without writing anything.
    pub async fn resolve(&self, token: &str) -> Result<String> {
        let decision = token.parse::<Decision>().map_err(|e| {
            error!("unhandled action: {}", token);
            Error::from(e)
        })?;
        self.resolve_decision(decision).await
    }

    /// Resolve a parsed decision. Returns the response written.
    pub async fn resolve_decision(&self, decision: Decision) -> Result<String> {
        let response = self.messages.read().await.response_for(decision).to_string();
        info!(%decision, response = %response, "Resolving decision");

        self.history.write().await.resolve_latest(&response);
        self.writer.write_response(&response).await?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use roomstatus_types::{SignalEvent, SignalKind};

    #[derive(Default)]
    struct Sink {
        written: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ResponseWriter for Sink {
        async fn write_response(&self, text: &str) -> Result<()> {
            self.written.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn router() -> (ResponseRouter, Arc<RwLock<History>>, Arc<Sink>) {
        let history = Arc::new(RwLock::new(History::new()));
        let sink = Arc::new(Sink::default());
        let router = ResponseRouter::new(
            Arc::clone(&history),
            MessageSettings::default(),
            sink.clone(),
        );
        (router, history, sink)
    }

    #[tokio::test]
    async fn test_tokens_map_to_configured_strings() {
        let (router, history, sink) = router();
        for _ in 0..3 {
            history.write().await.record(&SignalEvent::now(SignalKind::Call));
        }

        let defaults = MessageSettings::default();
        assert_eq!(router.resolve("ok").await.unwrap(), defaults.ok);
        assert_eq!(router.resolve("ng").await.unwrap(), defaults.busy);
        assert_eq!(router.resolve("yo_ok").await.unwrap(), defaults.confirm);

        assert_eq!(
            *sink.written.lock().unwrap(),
            vec![defaults.ok.clone(), defaults.busy.clone(), defaults.confirm.clone()]
        );
        assert!(history.read().await.entries().all(|e| e.is_resolved()));
    }

    #[tokio::test]
    async fn test_resolution_updates_most_recent_row() {
        let (router, history, _) = router();
        history.write().await.record(&SignalEvent::now(SignalKind::Call));
        history.write().await.record(&SignalEvent::now(SignalKind::Yo));

        router.resolve("yo_ok").await.unwrap();

        let history = history.read().await;
        let latest = history.latest().unwrap();
        assert_eq!(latest.title, "Yo");
        assert_eq!(latest.response.as_deref(), Some("確認しました"));
        assert!(!history.entries().nth(1).unwrap().is_resolved());
    }

    #[tokio::test]
    async fn test_unknown_token_writes_nothing() {
        let (router, history, sink) = router();
        history.write().await.record(&SignalEvent::now(SignalKind::Call));

        let err = router.resolve("maybe").await.unwrap_err();
        assert!(matches!(err, Error::UnrecognizedInput(_)));
        assert!(sink.written.lock().unwrap().is_empty());
        assert!(!history.read().await.latest().unwrap().is_resolved());
    }

    #[tokio::test]
    async fn test_custom_messages() {
        let (router, _, sink) = router();
        router
            .set_messages(MessageSettings {
                ok: "すぐ行きます".into(),
                ..MessageSettings::default()
            })
            .await;
        router.resolve("ok").await.unwrap();
        assert_eq!(*sink.written.lock().unwrap(), vec!["すぐ行きます".to_string()]);
    }
}
