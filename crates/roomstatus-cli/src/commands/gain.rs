//! Gain command implementation.

use std::sync::Arc;

use anyhow::{Result, bail};
use roomstatus_core::{GainSetting, PreferenceStore};

/// Show the stored gain, or validate and store a new one.
pub fn cmd_gain(preferences: Arc<dyn PreferenceStore>, value: Option<f32>) -> Result<f32> {
    let setting = GainSetting::new(preferences);
    match value {
        None => Ok(setting.load()),
        Some(gain) => {
            validate_gain(gain)?;
            setting.save(gain)?;
            Ok(gain)
        }
    }
}

/// Gain must be within `0.0..=1.0`.
pub fn validate_gain(gain: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&gain) {
        bail!("Gain must be between 0.0 and 1.0, got {gain}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use roomstatus_core::MemoryPreferences;

    use super::*;

    #[test]
    fn test_show_default_gain() {
        let prefs = Arc::new(MemoryPreferences::new());
        assert_eq!(cmd_gain(prefs, None).unwrap(), 0.0);
    }

    #[test]
    fn test_set_then_show() {
        let prefs = Arc::new(MemoryPreferences::new());
        cmd_gain(prefs.clone(), Some(0.25)).unwrap();
        assert_eq!(cmd_gain(prefs, None).unwrap(), 0.25);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let prefs = Arc::new(MemoryPreferences::new());
        assert!(cmd_gain(prefs.clone(), Some(1.5)).is_err());
        assert!(cmd_gain(prefs.clone(), Some(f32::NAN)).is_err());
        assert_eq!(cmd_gain(prefs, None).unwrap(), 0.0);
    }
}
