use std::io::Cursor;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::hash::ContentHash;
use super::namespace::Namespace;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Namespaced content-addressed blob storage.
///
/// A successful `put` returns a key that `get` and `size` accept in the same
/// namespace. A failed `put` leaves nothing a caller could reference.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes and return their key.
    async fn put(&self, data: &[u8], ns: &Namespace) -> Result<ContentHash, StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.put_stream(reader, ns).await
    }

    async fn put_stream(&self, reader: BoxReader, ns: &Namespace)
    -> Result<ContentHash, StorageError>;

    /// Retrieve all bytes of a blob. Fails with `NotFound` when absent.
    async fn get(&self, key: &ContentHash, ns: &Namespace) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(key, ns).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    async fn get_stream(&self, key: &ContentHash, ns: &Namespace)
    -> Result<BoxReader, StorageError>;

    /// Size of a blob in bytes. Fails with `NotFound` when absent.
    async fn size(&self, key: &ContentHash, ns: &Namespace) -> Result<u64, StorageError>;

    async fn exists(&self, key: &ContentHash, ns: &Namespace) -> Result<bool, StorageError>;

    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, key: &ContentHash, ns: &Namespace) -> Result<bool, StorageError>;
}
