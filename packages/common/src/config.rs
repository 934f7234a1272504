use std::path::PathBuf;

use serde::Deserialize;

use crate::storage::{FilesystemBlobStore, StorageError};

/// Blob store configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory of the filesystem store. Default: "./filestore".
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
    /// Largest accepted blob in bytes. Default: 256 MiB.
    #[serde(default = "default_max_blob_size")]
    pub max_blob_size: u64,
    /// Namespace used when the caller does not name one. Default: "default".
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./filestore")
}
fn default_max_blob_size() -> u64 {
    256 * 1024 * 1024
}
fn default_namespace() -> String {
    "default".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            max_blob_size: default_max_blob_size(),
            namespace: default_namespace(),
        }
    }
}

impl StorageConfig {
    pub async fn open(&self) -> Result<FilesystemBlobStore, StorageError> {
        FilesystemBlobStore::new(self.path.clone(), self.max_blob_size).await
    }
}
