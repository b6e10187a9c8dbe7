//! Data directory listings

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::timestamp::device_format;

/// One page of a device directory listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListing {
    /// Listed path, relative to the device data root
    pub path: String,
    /// Index of the first entry in this page
    #[serde(default)]
    pub index: usize,
    /// Total entries in the directory
    pub num_objects_in_dir: usize,
    /// Entries in this page
    pub num_objects_in_list: usize,
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub directories: Vec<DirectoryEntry>,
}

impl DirectoryListing {
    /// Whether more entries exist beyond this page
    pub fn has_more(&self) -> bool {
        self.index + self.num_objects_in_list < self.num_objects_in_dir
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    #[serde(with = "device_format")]
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    #[serde(with = "device_format")]
    pub timestamp: NaiveDateTime,
}
