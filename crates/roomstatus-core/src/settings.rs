//! Persisted preferences used by the core.
//!
//! The gain is stored as its decimal string under the key `"gain"`; a missing
//! or unparseable value reads as `0.0`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::error::{Error, Result};
use crate::traits::PreferenceStore;

/// Preference key holding the alert gain.
pub const GAIN_KEY: &str = "gain";

/// Gain used when nothing valid is stored.
pub const DEFAULT_GAIN: f32 = 0.0;

/// Typed access to the gain preference.
#[derive(Clone)]
pub struct GainSetting {
    store: Arc<dyn PreferenceStore>,
}

impl std::fmt::Debug for GainSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GainSetting").finish_non_exhaustive()
    }
}

impl GainSetting {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    /// Stored gain, or [`DEFAULT_GAIN`].
    pub fn load(&self) -> f32 {
        match self.store.get(GAIN_KEY) {
            Ok(Some(value)) => value.trim().parse::<f32>().unwrap_or_else(|_| {
                warn!(value = %value, "Ignoring unparseable gain");
                DEFAULT_GAIN
            }),
            Ok(None) => DEFAULT_GAIN,
            Err(e) => {
                warn!(error = %e, "Failed to read gain");
                DEFAULT_GAIN
            }
        }
    }

    /// Persist a gain value.
    pub fn save(&self, gain: f32) -> Result<()> {
        if !gain.is_finite() {
            return Err(Error::UnrecognizedInput(format!("gain {gain}")));
        }
        self.store.set(GAIN_KEY, &gain.to_string())
    }
}

/// Process-local [`PreferenceStore`], used in tests and when no database is configured.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|_| Error::Store("preferences lock poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| Error::Store("preferences lock poisoned".to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_defaults_to_zero() {
        let gain = GainSetting::new(Arc::new(MemoryPreferences::new()));
        assert_eq!(gain.load(), 0.0);
    }

    #[test]
    fn test_gain_round_trip() {
        let prefs = Arc::new(MemoryPreferences::new());
        let gain = GainSetting::new(prefs.clone());
        gain.save(0.25).unwrap();
        assert_eq!(gain.load(), 0.25);
        assert_eq!(prefs.get(GAIN_KEY).unwrap().as_deref(), Some("0.25"));
    }

    #[test]
    fn test_unparseable_gain_reads_as_default() {
        let prefs = Arc::new(MemoryPreferences::new());
        prefs.set(GAIN_KEY, "loud").unwrap();
        assert_eq!(GainSetting::new(prefs).load(), DEFAULT_GAIN);
    }

    #[test]
    fn test_rejects_non_finite_gain() {
        let gain = GainSetting::new(Arc::new(MemoryPreferences::new()));
        assert!(gain.save(f32::NAN).is_err());
    }
}
