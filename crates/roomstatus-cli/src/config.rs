//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use roomstatus_types::MessageSettings;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default scan timeout in seconds.
pub const DEFAULT_SCAN_TIMEOUT: u64 = 10;

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Device name or address to connect to
    #[serde(default)]
    pub device: Option<String>,

    /// Scan timeout in seconds
    #[serde(default)]
    pub scan_timeout: Option<u64>,

    /// Show desktop notifications for signals
    #[serde(default = "default_true")]
    pub notifications: bool,

    /// Maximum history rows kept while monitoring (0 keeps everything)
    #[serde(default)]
    pub history_limit: usize,

    /// Response strings written back to the device
    #[serde(default)]
    pub messages: MessageSettings,

    /// Last status written (auto-updated). `monitor` re-sends it after a
    /// reconnect until a new status is set.
    #[serde(default)]
    pub last_status: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: None,
            scan_timeout: None,
            notifications: true,
            history_limit: 0,
            messages: MessageSettings::default(),
            last_status: None,
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("roomstatus")
            .join("config.toml")
    }

    /// Load config from the default path, or return default if not found
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Load config from `path`. Unreadable or malformed files yield defaults.
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => warn!("Failed to parse config {}: {}", path.display(), e),
                },
                Err(e) => warn!("Failed to read config {}: {}", path.display(), e),
            }
        }
        Self::default()
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Scan timeout, falling back to the default.
    pub fn scan_timeout(&self) -> u64 {
        self.scan_timeout.unwrap_or(DEFAULT_SCAN_TIMEOUT)
    }
}

/// Resolve device from arg (or env var, via clap) or config.
pub fn resolve_device(device: Option<String>, config: &Config) -> Option<String> {
    device.or_else(|| config.device.clone())
}

/// Resolve timeout: an explicit value wins over config.
pub fn resolve_timeout(timeout: Option<u64>, config: &Config) -> u64 {
    timeout.unwrap_or_else(|| config.scan_timeout())
}

/// Record the last status written.
pub fn update_last_status(status: &str) -> Result<()> {
    let mut config = Config::load();
    config.last_status = Some(status.to_string());
    config.save()
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_resolve_device_prefers_arg() {
        let config = Config {
            device: Some("config-device".to_string()),
            ..Default::default()
        };
        let result = resolve_device(Some("arg-device".to_string()), &config);
        assert_eq!(result, Some("arg-device".to_string()));
    }

    #[test]
    fn test_resolve_device_falls_back_to_config() {
        let config = Config {
            device: Some("config-device".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_device(None, &config), Some("config-device".to_string()));
        assert_eq!(resolve_device(None, &Config::default()), None);
    }

    #[test]
    fn test_resolve_timeout() {
        let config = Config {
            scan_timeout: Some(20),
            ..Default::default()
        };
        assert_eq!(resolve_timeout(Some(5), &config), 5);
        assert_eq!(resolve_timeout(None, &config), 20);
        assert_eq!(resolve_timeout(None, &Config::default()), DEFAULT_SCAN_TIMEOUT);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            device = "RoomStatusMonitor"

            [messages]
            ok = "すぐ行きます"
            "#,
        )
        .unwrap();

        assert_eq!(config.device.as_deref(), Some("RoomStatusMonitor"));
        assert!(config.notifications);
        assert_eq!(config.messages.ok, "すぐ行きます");
        assert_eq!(config.messages.busy, MessageSettings::default().busy);
    }

    #[test]
    fn test_malformed_config_yields_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "device = [not toml").unwrap();

        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            history_limit: 50,
            last_status: Some("在室".to_string()),
            ..Default::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
    }
}
