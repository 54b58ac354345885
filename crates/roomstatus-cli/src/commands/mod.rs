//! Command implementations for the CLI.

mod config;
mod gain;
mod messages;
mod monitor;
mod read;
mod status;

pub use config::cmd_config;
pub use gain::cmd_gain;
pub use messages::{MessageEdits, cmd_messages};
pub use monitor::{MonitorArgs, cmd_monitor};
pub use read::cmd_read;
pub use status::cmd_status;
