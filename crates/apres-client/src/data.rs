//! Data directory listing and file download

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use reqwest::StatusCode;
use tracing::{debug, info, instrument};

use apres_core::paths;
use apres_core::DirectoryListing;

use crate::error::{ApresError, Result};
use crate::transport::Transport;

/// `data/*` endpoints
#[derive(Debug, Clone)]
pub struct DataResource {
    transport: Arc<Transport>,
}

impl DataResource {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// List a directory on the device, starting at entry `index`
    #[instrument(skip(self))]
    pub async fn dir(&self, path: Option<&str>, index: Option<usize>) -> Result<DirectoryListing> {
        let mut query = Vec::new();
        if let Some(path) = path {
            query.push(("path", path.to_string()));
        }
        if let Some(index) = index {
            query.push(("index", index.to_string()));
        }

        let response = self.transport.get(paths::DATA_DIR, &query).await?;
        if response.status != StatusCode::OK {
            return Err(response.unexpected());
        }

        let listing: DirectoryListing = serde_json::from_slice(&response.body)
            .map_err(|e| ApresError::malformed(e.to_string()))?;
        let listed = listing.files.len() + listing.directories.len();
        if listed != listing.num_objects_in_list {
            return Err(ApresError::malformed(format!(
                "numObjectsInList is {} but {} entries were listed",
                listing.num_objects_in_list, listed
            )));
        }
        debug!(entries = listed, "Listed {}", listing.path);
        Ok(listing)
    }

    /// Fetch a device file into memory
    #[instrument(skip(self))]
    pub async fn download_bytes(&self, remote: &str) -> Result<Bytes> {
        let query = [("path", remote.to_string())];
        let response = self.transport.get(paths::DATA_DOWNLOAD, &query).await?;
        if response.status != StatusCode::OK {
            return Err(response.unexpected());
        }
        Ok(response.body)
    }

    /// Download a device file to `local` (default: the remote file name)
    ///
    /// Returns the number of bytes written.
    #[instrument(skip(self))]
    pub async fn download(&self, remote: &str, local: Option<&Path>) -> Result<usize> {
        let target = match local {
            Some(path) => path.to_path_buf(),
            None => Path::new(remote)
                .file_name()
                .map(PathBuf::from)
                .ok_or_else(|| {
                    ApresError::InvalidArgument(format!("'{}' does not name a file", remote))
                })?,
        };

        let body = self.download_bytes(remote).await?;
        tokio::fs::write(&target, &body).await?;

        info!(path = %target.display(), bytes = body.len(), "Downloaded {}", remote);
        Ok(body.len())
    }
}
