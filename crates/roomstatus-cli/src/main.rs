//! `roomstatus`: companion for the RoomStatusMonitor call button.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `monitor` | Connect and answer calls from the terminal |
//! | `status` | Write the status shown on the device |
//! | `read` | Read the status and content channels |
//! | `gain` | Show or set the alert volume |
//! | `messages` | Show or change the response messages |
//! | `config` | Show the config file path or contents |
//! | `completions` | Generate shell completions |
//!
//! # Configuration
//!
//! `~/.config/roomstatus/config.toml` (or platform equivalent). The
//! `ROOMSTATUS_DEVICE` environment variable overrides the configured device.

use std::io;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

mod audio;
mod cli;
mod commands;
mod config;
mod notify;
mod prefs;
mod terminal;
mod util;

use cli::{Cli, Commands};
use commands::{MessageEdits, MonitorArgs};
use config::{Config, resolve_device, resolve_timeout};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle completions command early (before tracing init)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "roomstatus", &mut io::stdout());
        return Ok(());
    }

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut config = Config::load();

    match cli.command {
        Commands::Monitor {
            device,
            no_notify,
            confirm,
        } => {
            let args = MonitorArgs {
                device: resolve_device(device.device, &config),
                scan_timeout: resolve_timeout(device.timeout, &config),
                notifications: config.notifications && !no_notify,
                confirm,
                quiet: cli.quiet,
                no_color: cli.no_color,
            };
            commands::cmd_monitor(args, &config).await?;
        }
        Commands::Status { text, device } => {
            commands::cmd_status(
                &text,
                resolve_device(device.device, &config),
                resolve_timeout(device.timeout, &config),
                cli.quiet,
            )
            .await?;
        }
        Commands::Read { device } => {
            commands::cmd_read(
                resolve_device(device.device, &config),
                resolve_timeout(device.timeout, &config),
                cli.quiet,
            )
            .await?;
        }
        Commands::Gain { value } => {
            let gain = commands::cmd_gain(util::open_preferences()?, value)?;
            println!("gain: {gain}");
        }
        Commands::Messages {
            ok,
            busy,
            confirm,
            reset,
        } => {
            let edits = MessageEdits {
                ok,
                busy,
                confirm,
                reset,
            };
            commands::cmd_messages(&mut config, edits)?;
        }
        Commands::Config { action } => commands::cmd_config(action, &config)?,
        Commands::Completions { .. } => unreachable!("handled before tracing init"),
    }

    Ok(())
}
