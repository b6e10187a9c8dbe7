//! Data directory listing and download handlers

use std::path::{Component, Path, PathBuf};

use axum::extract::{Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Local, NaiveDateTime};
use serde::Deserialize;

use apres_core::{DirectoryEntry, DirectoryListing, FileEntry};

use crate::error::ApiError;
use crate::state::SimState;

#[derive(Debug, Deserialize)]
pub struct DirQuery {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub index: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub path: Option<String>,
}

/// Resolve a device path below the local folder, rejecting escapes
fn resolve(root: &Path, relative: &str) -> Result<PathBuf, ApiError> {
    let mut resolved = root.to_path_buf();
    for component in Path::new(relative.trim_matches('/')).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => return Err(ApiError::NotFound(relative.to_string())),
        }
    }
    Ok(resolved)
}

fn modified(metadata: &std::fs::Metadata) -> NaiveDateTime {
    let time = metadata
        .modified()
        .map(DateTime::<Local>::from)
        .unwrap_or_else(|_| Local::now());
    apres_core::parse_timestamp(&apres_core::format_timestamp(&time.naive_local()))
        .unwrap_or_else(|_| time.naive_local())
}

/// GET /api/data/dir?path=&index=
pub async fn dir(
    State(state): State<SimState>,
    Query(query): Query<DirQuery>,
) -> Result<Json<DirectoryListing>, ApiError> {
    let relative = query.path.unwrap_or_default();
    let dir = resolve(state.local_folder(), &relative)?;
    if !dir.is_dir() {
        return Err(ApiError::NotFound(relative));
    }

    let mut entries = Vec::new();
    let mut reader = tokio::fs::read_dir(&dir).await?;
    while let Some(entry) = reader.next_entry().await? {
        let metadata = entry.metadata().await?;
        entries.push((entry.file_name().to_string_lossy().into_owned(), metadata));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let index = query.index.unwrap_or(0);
    let total = entries.len();
    let page_size = state.config().page_size;

    let mut files = Vec::new();
    let mut directories = Vec::new();
    for (name, metadata) in entries.into_iter().skip(index).take(page_size) {
        let timestamp = modified(&metadata);
        if metadata.is_dir() {
            directories.push(DirectoryEntry { name, timestamp });
        } else {
            files.push(FileEntry {
                name,
                size: metadata.len(),
                timestamp,
            });
        }
    }

    Ok(Json(DirectoryListing {
        path: relative,
        index,
        num_objects_in_dir: total,
        num_objects_in_list: files.len() + directories.len(),
        files,
        directories,
    }))
}

/// GET /api/data/download?path=
pub async fn download(
    State(state): State<SimState>,
    Query(query): Query<DownloadQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let relative = query
        .path
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("path is required".to_string()))?;
    let path = resolve(state.local_folder(), &relative)?;
    if !path.is_file() {
        return Err(ApiError::NotFound(relative));
    }

    let content = tokio::fs::read(&path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tracing::debug!(path = %relative, bytes = content.len(), "Serving download");

    Ok((
        [
            (CONTENT_TYPE, "application/octet-stream".to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", name)),
        ],
        content,
    ))
}
