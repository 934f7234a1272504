use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use super::error::StorageError;
use super::hash::ContentHash;
use super::namespace::Namespace;
use super::traits::{BlobStore, BoxReader};

const READ_BUF_SIZE: usize = 64 * 1024;

/// Filesystem-backed blob store.
///
/// Layout: `{base_path}/{namespace}/{first 2 hex chars}/{remaining 62 hex chars}`.
/// Writes land in `{base_path}/.tmp` first and are renamed into place, so a
/// key is only ever visible once its file is complete.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    pub async fn new(base_path: impl Into<PathBuf>, max_size: u64) -> Result<Self, StorageError> {
        let base_path = base_path.into();
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn blob_path(&self, key: &ContentHash, ns: &Namespace) -> PathBuf {
        let (dir, file) = key.shard();
        self.base_path.join(ns.as_str()).join(dir).join(file)
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    fn check_size(&self, actual: u64) -> Result<(), StorageError> {
        if actual > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual,
                limit: self.max_size,
            });
        }
        Ok(())
    }

    /// Move a finished temp file to its final location. The temp file is
    /// gone afterwards whatever the outcome.
    async fn publish(&self, temp_path: &Path, blob_path: &Path) -> Result<(), StorageError> {
        let result = async {
            if fs::try_exists(blob_path).await? {
                return fs::remove_file(temp_path).await;
            }
            if let Some(parent) = blob_path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::rename(temp_path, blob_path).await
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Copy `reader` into `temp_file`, hashing and enforcing the size limit.
    async fn write_temp(
        &self,
        reader: &mut BoxReader,
        temp_file: &mut fs::File,
    ) -> Result<(ContentHash, u64), StorageError> {
        let mut hasher = Sha256::new();
        let mut total: u64 = 0;
        let mut buf = vec![0u8; READ_BUF_SIZE];

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            total += n as u64;
            self.check_size(total)?;
            hasher.update(&buf[..n]);
            temp_file.write_all(&buf[..n]).await?;
        }
        temp_file.flush().await?;

        Ok((ContentHash::from_bytes(hasher.finalize().into()), total))
    }
}

fn not_found(err: std::io::Error, key: &ContentHash) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::NotFound(key.to_hex())
    } else {
        err.into()
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, data: &[u8], ns: &Namespace) -> Result<ContentHash, StorageError> {
        self.check_size(data.len() as u64)?;

        let key = ContentHash::compute(data);
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        self.publish(&temp_path, &self.blob_path(&key, ns)).await?;
        debug!(%ns, %key, size = data.len(), "Stored blob");
        Ok(key)
    }

    async fn put_stream(
        &self,
        mut reader: BoxReader,
        ns: &Namespace,
    ) -> Result<ContentHash, StorageError> {
        let temp_path = self.temp_path();
        let mut temp_file = fs::File::create(&temp_path).await?;
        let written = self.write_temp(&mut reader, &mut temp_file).await;
        drop(temp_file);

        let (key, total) = match written {
            Ok(written) => written,
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(e);
            }
        };
        self.publish(&temp_path, &self.blob_path(&key, ns)).await?;
        debug!(%ns, %key, size = total, "Stored streamed blob");
        Ok(key)
    }

    async fn get_stream(
        &self,
        key: &ContentHash,
        ns: &Namespace,
    ) -> Result<BoxReader, StorageError> {
        let file = fs::File::open(self.blob_path(key, ns))
            .await
            .map_err(|e| not_found(e, key))?;
        Ok(Box::new(BufReader::new(file)))
    }

    async fn size(&self, key: &ContentHash, ns: &Namespace) -> Result<u64, StorageError> {
        let meta = fs::metadata(self.blob_path(key, ns))
            .await
            .map_err(|e| not_found(e, key))?;
        Ok(meta.len())
    }

    async fn exists(&self, key: &ContentHash, ns: &Namespace) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.blob_path(key, ns)).await?)
    }

    async fn delete(&self, key: &ContentHash, ns: &Namespace) -> Result<bool, StorageError> {
        match fs::remove_file(self.blob_path(key, ns)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
