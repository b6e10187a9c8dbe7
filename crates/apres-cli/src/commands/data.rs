//! Data commands - list and download files stored on the radar

use anyhow::{Context, Result};
use apres_client::{format_timestamp, ApresClient};
use std::path::Path;

use crate::output::{EntryRow, OutputContext, OutputFormat};

/// List a directory on the radar
pub async fn ls(
    client: &ApresClient,
    path: Option<&str>,
    index: Option<usize>,
    ctx: &OutputContext,
) -> Result<()> {
    let listing = client.data().dir(path, index).await?;

    if ctx.format == OutputFormat::Json {
        ctx.print_json(&listing);
        return Ok(());
    }

    let mut rows: Vec<EntryRow> = listing
        .directories
        .iter()
        .map(|d| EntryRow {
            name: format!("{}/", d.name),
            kind: "dir".to_string(),
            size: "-".to_string(),
            modified: format_timestamp(&d.timestamp),
        })
        .collect();
    rows.extend(listing.files.iter().map(|f| EntryRow {
        name: f.name.clone(),
        kind: "file".to_string(),
        size: f.size.to_string(),
        modified: format_timestamp(&f.timestamp),
    }));
    ctx.print(&rows);

    if listing.has_more() {
        ctx.info(&format!(
            "Showing {} of {} entries; continue with --index {}",
            listing.num_objects_in_list,
            listing.num_objects_in_dir,
            listing.index + listing.num_objects_in_list
        ));
    }
    Ok(())
}

/// Download a file from the radar
pub async fn download(
    client: &ApresClient,
    remote: &str,
    local: Option<&Path>,
    ctx: &OutputContext,
) -> Result<()> {
    let pb = ctx.spinner(&format!("Downloading {}...", remote));
    let bytes = client
        .data()
        .download(remote, local)
        .await
        .with_context(|| format!("Failed to download {}", remote));
    pb.finish_and_clear();

    ctx.success(&format!("Downloaded {} ({} bytes)", remote, bytes?));
    Ok(())
}
