use std::collections::HashMap;
use std::io::Cursor;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use super::error::StorageError;
use super::hash::ContentHash;
use super::namespace::Namespace;
use super::traits::{BlobStore, BoxReader};

/// `HashMap`-backed blob store for tests and embedding.
///
/// The store can be taken offline, after which every operation fails with
/// [`StorageError::Unavailable`].
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<(Namespace, ContentHash), Vec<u8>>>,
    offline: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of blobs across all namespaces.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &ContentHash, ns: &Namespace) -> bool {
        self.blobs
            .read()
            .expect("lock poisoned")
            .contains_key(&(ns.clone(), *key))
    }

    fn ensure_online(&self) -> Result<(), StorageError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }

    fn lookup(&self, key: &ContentHash, ns: &Namespace) -> Result<Vec<u8>, StorageError> {
        self.ensure_online()?;
        self.blobs
            .read()
            .expect("lock poisoned")
            .get(&(ns.clone(), *key))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_hex()))
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, data: &[u8], ns: &Namespace) -> Result<ContentHash, StorageError> {
        self.ensure_online()?;
        let key = ContentHash::compute(data);
        self.blobs
            .write()
            .expect("lock poisoned")
            .entry((ns.clone(), key))
            .or_insert_with(|| data.to_vec());
        Ok(key)
    }

    async fn put_stream(
        &self,
        mut reader: BoxReader,
        ns: &Namespace,
    ) -> Result<ContentHash, StorageError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        self.put(&data, ns).await
    }

    async fn get(&self, key: &ContentHash, ns: &Namespace) -> Result<Vec<u8>, StorageError> {
        self.lookup(key, ns)
    }

    async fn get_stream(
        &self,
        key: &ContentHash,
        ns: &Namespace,
    ) -> Result<BoxReader, StorageError> {
        Ok(Box::new(Cursor::new(self.lookup(key, ns)?)))
    }

    async fn size(&self, key: &ContentHash, ns: &Namespace) -> Result<u64, StorageError> {
        self.lookup(key, ns).map(|data| data.len() as u64)
    }

    async fn exists(&self, key: &ContentHash, ns: &Namespace) -> Result<bool, StorageError> {
        self.ensure_online()?;
        Ok(self.contains(key, ns))
    }

    async fn delete(&self, key: &ContentHash, ns: &Namespace) -> Result<bool, StorageError> {
        self.ensure_online()?;
        Ok(self
            .blobs
            .write()
            .expect("lock poisoned")
            .remove(&(ns.clone(), *key))
            .is_some())
    }
}

impl std::fmt::Debug for MemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBlobStore")
            .field("blob_count", &self.len())
            .field("offline", &self.offline.load(Ordering::SeqCst))
            .finish()
    }
}
