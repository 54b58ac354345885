//! In-memory log of signals and their responses.

use std::collections::VecDeque;

use roomstatus_types::{HistoryEntry, SignalEvent};

/// Newest-first list of [`HistoryEntry`] rows.
///
/// Unbounded unless a limit is set, in which case the oldest rows are
/// evicted.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    limit: Option<usize>,
}

impl History {
    /// Create an unbounded history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history holding at most `limit` rows. A limit of 0 means unbounded.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: (limit > 0).then_some(limit),
        }
    }

    /// Record a signal as a new unresolved row at the front.
    pub fn record(&mut self, event: &SignalEvent) -> &HistoryEntry {
        self.entries.push_front(HistoryEntry::from_signal(event));
        if let Some(limit) = self.limit {
            self.entries.truncate(limit);
        }
        &self.entries[0]
    }

    /// Set the response of the most recent unresolved row.
    ///
    /// Returns `false` when every row already has a response.
    pub fn resolve_latest(&mut self, response: &str) -> bool {
        match self.entries.iter_mut().find(|e| !e.is_resolved()) {
            Some(entry) => {
                entry.response = Some(response.to_string());
                true
            }
            None => false,
        }
    }

    /// Rows, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Most recent row.
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomstatus_types::SignalKind;

    #[test]
    fn test_newest_first() {
        let mut history = History::new();
        history.record(&SignalEvent::now(SignalKind::Call));
        history.record(&SignalEvent::now(SignalKind::Yo));

        let titles: Vec<_> = history.entries().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Yo", "Call"]);
        assert!(history.latest().unwrap().response.is_none());
    }

    #[test]
    fn test_resolve_latest_targets_newest_unresolved() {
        let mut history = History::new();
        history.record(&SignalEvent::now(SignalKind::Call));
        history.record(&SignalEvent::now(SignalKind::Call));

        assert!(history.resolve_latest("first"));
        assert!(history.resolve_latest("second"));
        assert!(!history.resolve_latest("third"));

        let responses: Vec<_> = history
            .entries()
            .map(|e| e.response.clone().unwrap())
            .collect();
        assert_eq!(responses, vec!["first", "second"]);
    }

    #[test]
    fn test_limit_evicts_oldest() {
        let mut history = History::with_limit(2);
        history.record(&SignalEvent::now(SignalKind::Call));
        history.record(&SignalEvent::now(SignalKind::Yo));
        history.record(&SignalEvent::now(SignalKind::Yo));
        assert_eq!(history.len(), 2);
        assert!(history.entries().all(|e| e.title == "Yo"));
    }

    #[test]
    fn test_zero_limit_is_unbounded() {
        let mut history = History::with_limit(0);
        for _ in 0..100 {
            history.record(&SignalEvent::now(SignalKind::Call));
        }
        assert_eq!(history.len(), 100);
    }
}
