//! Utility functions for CLI operations.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use roomstatus_core::{BtleTransport, Capability, ConnectionConfig, Error, LinkClient, LinkTransport};
use roomstatus_store::Store;
use tracing::info;

use crate::prefs::StorePreferences;

/// Build the BLE transport for a device filter and scan timeout.
pub fn build_transport(device: Option<String>, scan_timeout: u64) -> BtleTransport {
    let config = ConnectionConfig::default().scan_timeout(Duration::from_secs(scan_timeout));
    BtleTransport::new(config).with_device(device)
}

/// Open the on-disk preference store.
pub fn open_preferences() -> Result<Arc<StorePreferences>> {
    let path = roomstatus_store::default_db_path();
    let store = Store::open(&path)
        .with_context(|| format!("Failed to open preferences at {}", path.display()))?;
    Ok(Arc::new(StorePreferences::new(store)))
}

/// Turn link errors into messages that say what to do next.
pub fn link_error(err: Error) -> anyhow::Error {
    match err {
        Error::NoDeviceSelected => anyhow!(
            "No RoomStatusMonitor found nearby.\n\
             Make sure the device is powered on and in range, or pass --device."
        ),
        Error::CapabilityUnavailable(Capability::Bluetooth) => {
            anyhow!("Bluetooth is not available. Check that an adapter is present and enabled.")
        }
        other => anyhow::Error::new(other),
    }
}

/// Pair and connect, reporting the peer.
pub async fn connect<T: LinkTransport>(link: &LinkClient<T>, quiet: bool) -> Result<()> {
    link.connect().await.map_err(link_error)?;
    if let Some(peer) = link.connection().await.peer {
        info!(peer = %peer.id, "Connected");
        if !quiet {
            eprintln!("Connected to {}", peer.display_name());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_device_message_is_actionable() {
        let message = link_error(Error::NoDeviceSelected).to_string();
        assert!(message.contains("--device"));
    }

    #[test]
    fn test_other_errors_pass_through() {
        let err = link_error(Error::NotConnected);
        assert!(err.downcast_ref::<Error>().is_some());
    }
}
