//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};

/// Reusable device connection arguments
#[derive(Debug, Clone, Args)]
pub struct DeviceArgs {
    /// Device name or address, or use ROOMSTATUS_DEVICE env var
    #[arg(short, long, env = "ROOMSTATUS_DEVICE")]
    pub device: Option<String>,

    /// Scan timeout in seconds
    #[arg(short = 'T', long)]
    pub timeout: Option<u64>,
}

#[derive(Parser)]
#[command(name = "roomstatus")]
#[command(author, version, about = "Companion for the RoomStatusMonitor call button", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect and answer calls from the terminal
    Monitor {
        #[command(flatten)]
        device: DeviceArgs,

        /// Do not show desktop notifications
        #[arg(long)]
        no_notify: bool,

        /// Answer signals with a yes/no prompt instead of the decision dialog
        #[arg(long)]
        confirm: bool,
    },

    /// Write the status shown on the device
    Status {
        /// Status text
        text: String,

        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Read the status and content channels
    Read {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Show or set the alert volume (0.0 to 1.0)
    Gain {
        /// New gain
        value: Option<f32>,
    },

    /// Show or change the response messages
    Messages {
        /// Response when available
        #[arg(long)]
        ok: Option<String>,

        /// Response when busy
        #[arg(long)]
        busy: Option<String>,

        /// Acknowledgement for a yo
        #[arg(long)]
        confirm: Option<String>,

        /// Restore the default messages
        #[arg(long, conflicts_with_all = ["ok", "busy", "confirm"])]
        reset: bool,
    },

    /// Manage CLI configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Print the config file path
    Path,
    /// Print the current configuration
    Show,
}
