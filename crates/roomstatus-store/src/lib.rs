//! Local preference persistence for the RoomStatusMonitor companion.
//!
//! A small SQLite key/value table that survives restarts. The companion
//! keeps its alert gain here under the key `"gain"`.
//!
//! # Example
//!
//! ```no_run
//! use roomstatus_store::Store;
//!
//! let store = Store::open_default()?;
//! store.set_preference("gain", "0.5")?;
//! assert_eq!(store.get_preference("gain")?.as_deref(), Some("0.5"));
//! # Ok::<(), roomstatus_store::Error>(())
//! ```

mod error;
mod schema;
mod store;

pub use error::{Error, Result};
pub use store::{Preference, Store};

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/roomstatus/prefs.db`
/// - macOS: `~/Library/Application Support/roomstatus/prefs.db`
/// - Windows: `C:\Users\<user>\AppData\Local\roomstatus\prefs.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("roomstatus")
        .join("prefs.db")
}
