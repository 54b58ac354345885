//! Status command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use roomstatus_core::{LinkClient, NoopHandler};
use tracing::warn;

use crate::config::update_last_status;
use crate::util::{build_transport, connect, link_error};

pub async fn cmd_status(
    text: &str,
    device: Option<String>,
    scan_timeout: u64,
    quiet: bool,
) -> Result<()> {
    let link = LinkClient::new(
        Arc::new(build_transport(device, scan_timeout)),
        Arc::new(NoopHandler),
    );
    connect(&link, quiet).await?;

    let result = link
        .set_status(text)
        .await
        .map_err(link_error)
        .context("Failed to write status");
    link.disconnect().await.ok();
    result?;

    if let Err(e) = update_last_status(text) {
        warn!("Failed to remember status: {e:#}");
    }
    if !quiet {
        println!("Status set: {text}");
    }
    Ok(())
}
