//! SQLite-backed preferences for the session.

use std::sync::Mutex;

use roomstatus_core::{Error, PreferenceStore};
use roomstatus_store::Store;

/// [`PreferenceStore`] over the on-disk [`Store`].
pub struct StorePreferences {
    store: Mutex<Store>,
}

impl StorePreferences {
    pub fn new(store: Store) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    fn with_store<R>(
        &self,
        f: impl FnOnce(&Store) -> roomstatus_store::Result<R>,
    ) -> roomstatus_core::Result<R> {
        let store = self
            .store
            .lock()
            .map_err(|_| Error::Store("preference store lock poisoned".to_string()))?;
        f(&store).map_err(|e| Error::Store(e.to_string()))
    }
}

impl PreferenceStore for StorePreferences {
    fn get(&self, key: &str) -> roomstatus_core::Result<Option<String>> {
        self.with_store(|store| store.get_preference(key))
    }

    fn set(&self, key: &str, value: &str) -> roomstatus_core::Result<()> {
        self.with_store(|store| store.set_preference(key, value))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use roomstatus_core::GainSetting;

    use super::*;

    #[test]
    fn test_gain_round_trip_through_store() {
        let prefs = Arc::new(StorePreferences::new(Store::open_in_memory().unwrap()));
        let gain = GainSetting::new(prefs);
        assert_eq!(gain.load(), 0.0);

        gain.save(0.4).unwrap();
        assert_eq!(gain.load(), 0.4);
    }

    #[test]
    fn test_store_errors_are_mapped() {
        let prefs = StorePreferences::new(Store::open_in_memory().unwrap());
        assert!(matches!(prefs.set("", "x"), Err(Error::Store(_))));
    }
}
