//! Read command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use roomstatus_core::{LinkClient, NoopHandler};
use roomstatus_types::Channel;

use crate::util::{build_transport, connect, link_error};

pub async fn cmd_read(device: Option<String>, scan_timeout: u64, quiet: bool) -> Result<()> {
    let link = LinkClient::new(
        Arc::new(build_transport(device, scan_timeout)),
        Arc::new(NoopHandler),
    );
    connect(&link, quiet).await?;

    let status = link.read_channel(Channel::Status).await;
    let content = link.read_channel(Channel::Content).await;
    link.disconnect().await.ok();

    let status = status.map_err(link_error).context("Failed to read status")?;
    let content = content.map_err(link_error).context("Failed to read content")?;

    println!("status:  {status}");
    println!("content: {content}");
    Ok(())
}
